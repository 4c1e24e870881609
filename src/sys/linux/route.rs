use crate::format::format_ip_bytes;
use crate::gateway::{select_defaults, GatewayCandidate};
use crate::sys::posix::if_indextoname;
use crate::traits::GatewaySourceT;
use crate::{AddressFamily, Error, GatewayTable};
use libc::{NLM_F_DUMP_INTR, NLM_F_MULTI, RT_TABLE_MAIN};
use log::{debug, trace};
use netlink_packet_route::route::Nla;
use netlink_packet_route::{
    NetlinkHeader, NetlinkMessage, NetlinkPayload, RouteMessage, RtnlMessage, NLM_F_DUMP,
    NLM_F_REQUEST,
};
use netlink_sys::constants::NETLINK_ROUTE;
use netlink_sys::{Socket, SocketAddr};
use std::io::{self, ErrorKind};

const RECEIVE_BUFFER_LEN: usize = 32 * 1024;
const NLMSG_HDRLEN: usize = 16;

/// What a batch of netlink messages did to the running dump.
#[derive(Debug, PartialEq, Eq)]
enum DumpProgress {
    More,
    Done,
    /// The dump ran to its end, but the routing table changed under it.
    Interrupted,
}

/// One `RTM_GETROUTE` dump, carried across datagrams.
#[derive(Debug, Default)]
struct RouteDump {
    candidates: Vec<GatewayCandidate>,
    interrupted: bool,
}

impl RouteDump {
    fn finish(&self) -> DumpProgress {
        if self.interrupted {
            DumpProgress::Interrupted
        } else {
            DumpProgress::Done
        }
    }
}

pub(crate) struct NetlinkSource;

impl GatewaySourceT for NetlinkSource {
    fn gateways() -> Result<GatewayTable, Error> {
        let mut socket = Socket::new(NETLINK_ROUTE).map_err(Error::route_query)?;
        let local = socket.bind_auto().map_err(Error::route_query)?;
        socket
            .connect(&SocketAddr::new(0, 0))
            .map_err(Error::route_query)?;
        let port = local.port_number();

        let mut receive_buffer = vec![0; RECEIVE_BUFFER_LEN];
        let mut seq = 0;

        'dump: loop {
            seq += 1;
            send_route_dump(&socket, seq)?;

            let mut dump = RouteDump::default();
            loop {
                let size = match socket.recv(&mut &mut receive_buffer[..], 0) {
                    Ok(size) => size,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(Error::RouteQuery(e)),
                };

                let progress = parse_datagram(
                    &receive_buffer[..size],
                    seq,
                    port,
                    if_indextoname,
                    &mut dump,
                )?;
                match progress {
                    DumpProgress::More => continue,
                    DumpProgress::Done => break 'dump Ok(select_defaults(dump.candidates)),
                    // The old dump has been read to its end, so a new one can start
                    DumpProgress::Interrupted => {
                        debug!("route dump {} interrupted, restarting", seq);
                        continue 'dump;
                    }
                }
            }
        }
    }
}

fn send_route_dump(socket: &Socket, seq: u32) -> Result<(), Error> {
    let mut req = NetlinkMessage {
        header: NetlinkHeader {
            flags: NLM_F_DUMP | NLM_F_REQUEST,
            sequence_number: seq,
            ..Default::default()
        },
        payload: NetlinkPayload::from(RtnlMessage::GetRoute(RouteMessage::default())),
    };

    req.finalize();

    let mut buf = vec![0; req.header.length as usize];
    req.serialize(&mut buf[..]);

    debug!(">>> {:?}", req);
    socket.send(&buf[..], 0).map_err(Error::route_query)?;
    Ok(())
}

/// Collects gateway candidates from one datagram of a route dump.
///
/// Messages that belong to another request, or that cannot be decoded, are skipped. A
/// datagram without any message of the current request leaves the dump running.
fn parse_datagram<F>(
    bytes: &[u8],
    seq: u32,
    port: u32,
    resolve: F,
    dump: &mut RouteDump,
) -> Result<DumpProgress, Error>
where
    F: Fn(u32) -> Option<String>,
{
    let mut offset = 0;
    let mut last_multipart = None;

    while offset + NLMSG_HDRLEN <= bytes.len() {
        let rest = &bytes[offset..];
        let len = u32::from_ne_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if len < NLMSG_HDRLEN || len > rest.len() {
            trace!("truncated netlink message ({} of {} bytes)", rest.len(), len);
            break;
        }
        offset += (len + 3) & !3;

        let msg = match NetlinkMessage::<RtnlMessage>::deserialize(&rest[..len]) {
            Ok(msg) => msg,
            Err(e) => {
                trace!("skipping undecodable netlink message: {:?}", e);
                continue;
            }
        };

        // Not ours
        if msg.header.sequence_number != seq || msg.header.port_number != port {
            continue;
        }

        if msg.header.flags & NLM_F_DUMP_INTR as u16 != 0 {
            dump.interrupted = true;
        }
        last_multipart = Some(msg.header.flags & NLM_F_MULTI as u16 != 0);

        match msg.payload {
            NetlinkPayload::Done => return Ok(dump.finish()),
            NetlinkPayload::Error(err) if err.code != 0 => {
                return Err(Error::RouteQuery(io::Error::from_raw_os_error(-err.code)));
            }
            NetlinkPayload::InnerMessage(RtnlMessage::NewRoute(route)) => {
                if let Some(candidate) = route_candidate(&route, &resolve) {
                    trace!("gateway candidate: {:?}", candidate);
                    dump.candidates.push(candidate);
                }
            }
            other => trace!("ignoring netlink message: {:?}", other),
        }
    }

    match last_multipart {
        Some(false) => Ok(dump.finish()),
        _ => Ok(DumpProgress::More),
    }
}

/// A route is a gateway route if it has a gateway and an output interface but no destination.
fn route_candidate<F>(route: &RouteMessage, resolve: &F) -> Option<GatewayCandidate>
where
    F: Fn(u32) -> Option<String>,
{
    let mut has_destination = false;
    let mut gateway = None;
    let mut oif = None;
    let mut priority = None;
    let mut table = route.header.table as u32;

    for nla in &route.nlas {
        match nla {
            Nla::Destination(_) => has_destination = true,
            Nla::Gateway(addr) => gateway = Some(addr.as_slice()),
            Nla::Oif(index) => oif = Some(*index),
            Nla::Priority(metric) => priority = Some(*metric),
            Nla::Table(id) => table = *id,
            _ => {}
        }
    }

    if has_destination {
        return None;
    }
    let gateway = format_ip_bytes(gateway?)?;
    let oif = oif?;
    let Some(interface) = resolve(oif) else {
        trace!("no interface with index {}, skipping {}", oif, gateway);
        return None;
    };

    Some(GatewayCandidate {
        family: AddressFamily::from_raw(route.header.address_family as i32),
        gateway,
        interface,
        metric: priority,
        table: Some(table),
        eligible: table == RT_TABLE_MAIN as u32,
    })
}
