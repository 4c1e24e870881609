use netiface::{interface_addresses, list_gateways, list_interfaces};
use netiface::{AddressTable, Destination, Error, GatewayTable};

use clap::{Parser, Subcommand};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[clap(version, about = "Show network interfaces, addresses and gateways")]
struct Cli {
    /// Print JSON instead of text
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List interface names
    ListInterfaces,
    /// Show the addresses of an interface
    Addresses {
        #[clap(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,
        /// Show the addresses of every interface
        #[clap(long)]
        all: bool,
    },
    /// Show gateways and the default gateway of each family
    Gateways,
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("cannot serialize: {}", e),
    }
}

fn print_addresses(name: &str, table: &AddressTable) {
    println!("{}:", name);
    for (family, records) in table.iter() {
        for record in records {
            print!("  {}", family);
            if let Some(address) = &record.address {
                print!(" addr {}", address);
            }
            if let Some(netmask) = &record.netmask {
                print!(" netmask {}", netmask);
            }
            match &record.destination {
                Some(Destination::Broadcast(broadcast)) => print!(" broadcast {}", broadcast),
                Some(Destination::Peer(peer)) => print!(" peer {}", peer),
                None => {}
            }
            if let Some(flags) = record.flags {
                print!(" flags {:#x}", flags);
            }
            println!();
        }
    }
}

fn print_gateways(table: &GatewayTable) {
    for (family, routes) in table.routes().iter() {
        println!("{}:", family);
        for route in routes {
            print!("  {} via {}", route.gateway, route.interface);
            if let Some(metric) = route.metric {
                print!(" metric {}", metric);
            }
            if let Some(table) = route.table {
                print!(" table {}", table);
            }
            if route.is_default {
                print!(" default");
            }
            println!();
        }
    }
    for (family, default) in table.defaults() {
        println!("default {}: {} via {}", family, default.gateway, default.interface);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Commands::ListInterfaces => {
            let names = list_interfaces()?;
            if cli.json {
                print_json(&names);
                return Ok(());
            }
            for name in names {
                println!("{}", name);
            }
        }
        Commands::Addresses { name, all } => {
            let names = match name {
                Some(name) if !all => vec![name],
                _ => list_interfaces()?,
            };

            let mut tables = BTreeMap::new();
            for name in names {
                match interface_addresses(&name) {
                    Ok(table) => {
                        tables.insert(name, table);
                    }
                    // Interfaces can go away between listing and lookup
                    Err(Error::NoSuchInterface(name)) if all => {
                        debug!("{} disappeared", name);
                    }
                    Err(e) => return Err(e),
                }
            }

            if cli.json {
                print_json(&tables);
                return Ok(());
            }
            for (name, table) in &tables {
                print_addresses(name, table);
            }
        }
        Commands::Gateways => {
            let table = list_gateways()?;
            if cli.json {
                print_json(&table);
                return Ok(());
            }
            print_gateways(&table);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("netifacectl: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn addresses_needs_name_or_all() {
        assert!(Cli::try_parse_from(["netifacectl", "addresses"]).is_err());
        assert!(Cli::try_parse_from(["netifacectl", "addresses", "lo", "--all"]).is_err());

        let cli = Cli::try_parse_from(["netifacectl", "--json", "addresses", "--all"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Addresses { name: None, all: true }));
    }
}
