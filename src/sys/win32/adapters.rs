use crate::format::{format_cidr, format_hex, format_sockaddr, RawSockaddr};
use crate::names::InterfaceNames;
use crate::prefix::{best_prefix, mask_from_prefix};
use crate::record::{AddressRecord, Destination};
use crate::traits::AddressSourceT;
use crate::{AddressFamily, AddressTable, Error};
use ipnet::IpNet;
use log::{debug, trace};
use std::ffi::CStr;
use std::io;
use std::marker::PhantomData;
use std::net::IpAddr;
use windows::Win32::Foundation::{ERROR_BUFFER_OVERFLOW, ERROR_NO_DATA, ERROR_SUCCESS};
use windows::Win32::NetworkManagement::IpHelper::{
    GetAdaptersAddresses, GAA_FLAG_INCLUDE_PREFIX, GET_ADAPTERS_ADDRESSES_FLAGS,
    IP_ADAPTER_ADDRESSES_LH, IP_ADAPTER_PREFIX_XP, IP_ADAPTER_UNICAST_ADDRESS_LH,
};
use windows::Win32::Networking::WinSock::{AF_UNSPEC, SOCKET_ADDRESS};

/// Recommended starting size for `GetAdaptersAddresses`.
const INITIAL_BUFFER_LEN: usize = 15 * 1024;

/// Result of `GetAdaptersAddresses`: a linked list of adapters living in one buffer.
struct Adapters {
    // u64 keeps the records aligned
    buffer: Vec<u64>,
}

impl Adapters {
    fn query(flags: GET_ADAPTERS_ADDRESSES_FLAGS) -> Result<Self, Error> {
        let mut size = INITIAL_BUFFER_LEN as u32;
        loop {
            let words = (size as usize + 7) / 8;
            let mut buffer: Vec<u64> = Vec::new();
            buffer.try_reserve_exact(words)?;
            buffer.resize(words, 0);

            // SAFETY: the buffer holds `size` writable bytes and outlives the call
            let code = unsafe {
                GetAdaptersAddresses(
                    AF_UNSPEC.0 as u32,
                    flags,
                    std::ptr::null_mut(),
                    buffer.as_mut_ptr() as *mut IP_ADAPTER_ADDRESSES_LH,
                    &mut size,
                )
            };
            match code {
                c if c == ERROR_SUCCESS.0 => return Ok(Self { buffer }),
                c if c == ERROR_NO_DATA.0 => return Ok(Self { buffer: vec![] }),
                c if c == ERROR_BUFFER_OVERFLOW.0 => {
                    trace!("adapter list needs {} bytes", size);
                    continue;
                }
                c => return Err(Error::Enumeration(io::Error::from_raw_os_error(c as i32))),
            }
        }
    }

    fn iter(&self) -> Iter<'_, IP_ADAPTER_ADDRESSES_LH> {
        let head = if self.buffer.is_empty() {
            std::ptr::null()
        } else {
            self.buffer.as_ptr() as *const IP_ADAPTER_ADDRESSES_LH
        };
        Iter::new(head)
    }
}

/// The IP helper lists are all singly linked through a `Next` field.
trait Linked {
    fn next(&self) -> *const Self;
}

impl Linked for IP_ADAPTER_ADDRESSES_LH {
    fn next(&self) -> *const Self {
        self.Next
    }
}

impl Linked for IP_ADAPTER_UNICAST_ADDRESS_LH {
    fn next(&self) -> *const Self {
        self.Next
    }
}

impl Linked for IP_ADAPTER_PREFIX_XP {
    fn next(&self) -> *const Self {
        self.Next
    }
}

struct Iter<'a, T> {
    next: *const T,
    phantom: PhantomData<&'a T>,
}

impl<'a, T> Iter<'a, T> {
    fn new(head: *const T) -> Self {
        Self {
            next: head,
            phantom: PhantomData,
        }
    }
}

impl<'a, T: Linked> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: list nodes live in the adapter buffer borrowed for 'a
        let item = unsafe { self.next.as_ref() }?;
        self.next = item.next();
        Some(item)
    }
}

fn adapter_name(adapter: &IP_ADAPTER_ADDRESSES_LH) -> Option<&str> {
    if adapter.AdapterName.0.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(adapter.AdapterName.0 as *const _) }
        .to_str()
        .ok()
}

fn socket_address(address: &SOCKET_ADDRESS) -> Option<RawSockaddr> {
    if address.lpSockaddr.is_null() || address.iSockaddrLength < 2 {
        return None;
    }
    let bytes = unsafe {
        std::slice::from_raw_parts(
            address.lpSockaddr as *const u8,
            address.iSockaddrLength as usize,
        )
    };
    let family = u16::from_ne_bytes([bytes[0], bytes[1]]);
    Some(RawSockaddr::new(
        AddressFamily::from_raw(family as i32),
        bytes.to_vec(),
    ))
}

fn ip_of(sa: &RawSockaddr) -> Option<IpAddr> {
    match sa.family() {
        AddressFamily::INET => sa.ipv4().map(IpAddr::V4),
        AddressFamily::INET6 => sa.ipv6().map(|(ip, _)| IpAddr::V6(ip)),
        _ => None,
    }
}

/// On-link prefixes of an adapter.
fn prefixes(adapter: &IP_ADAPTER_ADDRESSES_LH) -> Vec<IpNet> {
    Iter::new(adapter.FirstPrefix as *const IP_ADAPTER_PREFIX_XP)
        .filter_map(|prefix| {
            let addr = ip_of(&socket_address(&prefix.Address)?)?;
            IpNet::new(addr, prefix.PrefixLength.try_into().ok()?).ok()
        })
        .collect()
}

/// Windows reports no netmask or broadcast address, so both are derived from the best
/// matching on-link prefix. Addresses outside every prefix are left out.
fn unicast_record(sa: &RawSockaddr, prefixes: &[IpNet]) -> Option<AddressRecord> {
    let ip = ip_of(sa)?;
    let prefix = best_prefix(ip, prefixes.iter().copied())?;

    let mut record = AddressRecord {
        address: Some(format_sockaddr(sa)?),
        ..Default::default()
    };
    record.netmask = match prefix {
        IpNet::V4(net) => Some(net.netmask().to_string()),
        IpNet::V6(net) => mask_from_prefix(net.prefix_len()).map(|mask| format_cidr(&mask)),
    };
    record.destination = Some(Destination::Broadcast(prefix.broadcast().to_string()));

    if let IpAddr::V4(ip) = ip {
        record.drop_link_local_broadcast(ip);
    }
    Some(record)
}

pub(crate) struct AdapterSource;

impl AddressSourceT for AdapterSource {
    fn interfaces() -> Result<Vec<String>, Error> {
        let adapters = Adapters::query(GET_ADAPTERS_ADDRESSES_FLAGS(0))?;

        let mut names = InterfaceNames::default();
        for name in adapters.iter().filter_map(adapter_name) {
            names.push(name);
        }
        Ok(names.into_vec())
    }

    fn addresses(name: &str) -> Result<AddressTable, Error> {
        let adapters = Adapters::query(GAA_FLAG_INCLUDE_PREFIX)?;

        let mut table = AddressTable::new();
        let mut found = false;
        for adapter in adapters
            .iter()
            .filter(|adapter| adapter_name(adapter) == Some(name))
        {
            found = true;

            let hwlen = (adapter.PhysicalAddressLength as usize).min(adapter.PhysicalAddress.len());
            if let Some(hwaddr) = format_hex(&adapter.PhysicalAddress[..hwlen]) {
                let record = AddressRecord {
                    address: Some(hwaddr),
                    ..Default::default()
                };
                table.push_record(AddressFamily::LINK, record);
            }

            let prefixes = prefixes(adapter);
            let unicast = adapter.FirstUnicastAddress as *const IP_ADAPTER_UNICAST_ADDRESS_LH;
            for address in Iter::new(unicast) {
                let Some(sa) = socket_address(&address.Address) else {
                    continue;
                };
                match unicast_record(&sa, &prefixes) {
                    Some(record) => table.push_record(sa.family(), record),
                    None => trace!("{}: no on-link prefix for {:?}", name, format_sockaddr(&sa)),
                }
            }
        }

        if !found {
            return Err(Error::NoSuchInterface(name.to_owned()));
        }
        debug!("{}: {} address families", name, table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::format::inet;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn derived_netmask_and_broadcast() {
        let prefixes = vec![net("192.168.1.0/24"), net("192.168.1.10/32")];
        let record = unicast_record(&inet([192, 168, 1, 10]), &prefixes).unwrap();
        assert_eq!(record.netmask.as_deref(), Some("255.255.255.0"));
        assert_eq!(record.broadcast(), Some("192.168.1.255"));
    }

    #[test]
    fn address_outside_prefixes_is_skipped() {
        assert!(unicast_record(&inet([10, 0, 0, 1]), &[]).is_none());
        assert!(unicast_record(&inet([10, 0, 0, 1]), &[net("192.168.1.0/24")]).is_none());
    }

    #[test]
    fn link_local_without_broadcast() {
        let record = unicast_record(&inet([169, 254, 1, 2]), &[net("169.254.0.0/16")]).unwrap();
        assert_eq!(record.netmask.as_deref(), Some("255.255.0.0"));
        assert_eq!(record.broadcast(), None);
    }

    #[test]
    fn adapters_are_listed() {
        let names = AdapterSource::interfaces().unwrap();
        for name in names {
            match AdapterSource::addresses(&name) {
                Ok(_) => {}
                Err(Error::NoSuchInterface(_)) => {
                    let names = AdapterSource::interfaces().unwrap();
                    assert!(!names.contains(&name), "{} listed but not found", name);
                }
                Err(e) => panic!("{}: {}", name, e),
            }
        }
    }
}
