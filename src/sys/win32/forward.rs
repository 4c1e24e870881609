use super::mib_table::MibTable;
use crate::format::{format_sockaddr, RawSockaddr};
use crate::gateway::{select_defaults, GatewayCandidate};
use crate::traits::GatewaySourceT;
use crate::{AddressFamily, Error, GatewayTable};
use log::{debug, trace};
use std::io;
use std::mem;
use std::net::Ipv4Addr;
use widestring::U16CStr;
use windows::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, ERROR_SUCCESS};
use windows::Win32::NetworkManagement::IpHelper::{
    GetIfEntry, GetIpForwardTable, MIB_IFROW, MIB_IPFORWARDROW, MIB_IPFORWARDTABLE,
    MIB_IPFORWARD_ROW2,
};
use windows::Win32::Networking::WinSock::{AF_UNSPEC, SOCKADDR_INET};

const DEVICE_PREFIX: &str = "\\DEVICE\\TCPIP_";
const MIB_IPROUTE_TYPE_INDIRECT: u32 = 4;

/// Default routes from the IP helper forwarding tables. Uses `GetIpForwardTable2` where the
/// system has it and falls back to the IPv4-only `GetIpForwardTable` when it is missing or
/// fails.
pub(crate) struct ForwardTableSource;

impl GatewaySourceT for ForwardTableSource {
    fn gateways() -> Result<GatewayTable, Error> {
        let candidates = match MibTable::GetIpForwardTable2(AF_UNSPEC.0 as u16) {
            Some(Ok(table)) => table
                .as_slice()
                .iter()
                .filter_map(candidate_from_row2)
                .collect(),
            Some(Err(e)) => {
                debug!("GetIpForwardTable2 failed: {}", e);
                legacy_candidates()?
            }
            None => legacy_candidates()?,
        };
        Ok(select_defaults(candidates))
    }
}

/// Strips the `\DEVICE\TCPIP_` prefix `GetIfEntry` puts in front of adapter names.
fn strip_device_prefix(name: &str) -> &str {
    match name.get(..DEVICE_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(DEVICE_PREFIX) => &name[DEVICE_PREFIX.len()..],
        _ => name,
    }
}

fn interface_name(index: u32) -> Option<String> {
    let mut row = MIB_IFROW {
        dwIndex: index,
        ..Default::default()
    };
    let code = unsafe { GetIfEntry(&mut row) };
    if code != ERROR_SUCCESS.0 {
        trace!("GetIfEntry({}) failed: {}", index, code);
        return None;
    }

    let name = U16CStr::from_slice_truncate(&row.wszName).ok()?.to_string().ok()?;
    Some(strip_device_prefix(&name).to_owned())
}

fn next_hop(addr: &SOCKADDR_INET) -> RawSockaddr {
    let bytes = unsafe {
        std::slice::from_raw_parts(
            addr as *const _ as *const u8,
            mem::size_of::<SOCKADDR_INET>(),
        )
    };
    let family = u16::from_ne_bytes([bytes[0], bytes[1]]);
    RawSockaddr::new(AddressFamily::from_raw(family as i32), bytes.to_vec())
}

/// A row is a gateway if it is a zero-length prefix with a non-zero next hop.
fn candidate_from_row2(row: &MIB_IPFORWARD_ROW2) -> Option<GatewayCandidate> {
    if row.DestinationPrefix.PrefixLength != 0 {
        return None;
    }

    let hop = next_hop(&row.NextHop);
    let unspecified = match hop.family() {
        AddressFamily::INET => hop.ipv4()?.is_unspecified(),
        AddressFamily::INET6 => hop.ipv6()?.0.is_unspecified(),
        _ => return None,
    };
    if unspecified {
        return None;
    }

    Some(GatewayCandidate {
        family: hop.family(),
        gateway: format_sockaddr(&hop)?,
        interface: interface_name(row.InterfaceIndex)?,
        metric: Some(row.Metric),
        table: None,
        eligible: true,
    })
}

/// Rows of the legacy table.
struct ForwardRows {
    // u32 keeps the rows aligned
    buffer: Vec<u32>,
}

impl ForwardRows {
    fn query() -> Result<Self, Error> {
        let mut size = 0u32;
        let mut buffer: Vec<u32> = vec![];
        loop {
            let ptr = if buffer.is_empty() {
                std::ptr::null_mut()
            } else {
                buffer.as_mut_ptr() as *mut MIB_IPFORWARDTABLE
            };
            let code = unsafe { GetIpForwardTable(ptr, &mut size, false) };
            match code {
                c if c == ERROR_SUCCESS.0 => return Ok(Self { buffer }),
                c if c == ERROR_INSUFFICIENT_BUFFER.0 => {
                    let words = (size as usize + 3) / 4;
                    buffer.clear();
                    buffer.try_reserve_exact(words)?;
                    buffer.resize(words, 0);
                }
                c => return Err(Error::RouteQuery(io::Error::from_raw_os_error(c as i32))),
            }
        }
    }

    fn as_slice(&self) -> &[MIB_IPFORWARDROW] {
        if self.buffer.is_empty() {
            return &[];
        }
        let table = unsafe { &*(self.buffer.as_ptr() as *const MIB_IPFORWARDTABLE) };
        unsafe { std::slice::from_raw_parts(table.table.as_ptr(), table.dwNumEntries as usize) }
    }
}

fn legacy_candidates() -> Result<Vec<GatewayCandidate>, Error> {
    debug!("falling back to GetIpForwardTable");
    let rows = ForwardRows::query()?;

    Ok(rows
        .as_slice()
        .iter()
        .filter(|row| {
            row.dwForwardDest == 0
                && row.dwForwardNextHop != 0
                && unsafe { row.Anonymous1.dwForwardType } == MIB_IPROUTE_TYPE_INDIRECT
        })
        .filter_map(|row| {
            // dwForwardNextHop holds the address in network order
            let gateway = Ipv4Addr::from(row.dwForwardNextHop.to_ne_bytes());
            Some(GatewayCandidate {
                family: AddressFamily::INET,
                gateway: gateway.to_string(),
                interface: interface_name(row.dwForwardIfIndex)?,
                metric: Some(row.dwForwardMetric1),
                table: None,
                eligible: true,
            })
        })
        .collect())
}
