use super::{is_unscoped, rt_msghdr, RT_MSGHDR_LEN};
use crate::format::format_sockaddr;
use crate::gateway::{select_defaults, GatewayCandidate};
use crate::sys::posix::if_indextoname;
use crate::sys::rtmsg::{
    is_wildcard, RouteAddrs, RouteMessages, RTA_DST, RTA_GATEWAY, SOCKADDR_ALIGN,
};
use crate::traits::GatewaySourceT;
use crate::{Error, GatewayTable};
use log::{debug, trace};
use nix::errno::Errno;
use std::ptr;

/// Reads the routing table with `sysctl(3)`: `NET_RT_FLAGS` filtered on up gateway routes.
pub(crate) struct SysctlSource;

impl GatewaySourceT for SysctlSource {
    fn gateways() -> Result<GatewayTable, Error> {
        let dump = route_dump()?;
        debug!("route dump: {} bytes", dump.len());

        let candidates = RouteMessages::new(&dump, RT_MSGHDR_LEN)
            .filter_map(candidate)
            .collect();
        Ok(select_defaults(candidates))
    }
}

fn route_dump() -> Result<Vec<u8>, Error> {
    let mut mib = [
        libc::CTL_NET,
        libc::PF_ROUTE,
        0,
        0,
        libc::NET_RT_FLAGS,
        libc::RTF_UP | libc::RTF_GATEWAY,
    ];
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let mut len = 0;
        let ret = unsafe {
            libc::sysctl(
                mib.as_mut_ptr(),
                mib.len() as libc::c_uint,
                ptr::null_mut(),
                &mut len,
                ptr::null_mut(),
                0,
            )
        };
        Errno::result(ret).map_err(Error::route_query)?;

        buffer.clear();
        buffer.try_reserve(len)?;
        buffer.resize(len, 0);

        let ret = unsafe {
            libc::sysctl(
                mib.as_mut_ptr(),
                mib.len() as libc::c_uint,
                buffer.as_mut_ptr() as *mut libc::c_void,
                &mut len,
                ptr::null_mut(),
                0,
            )
        };
        match Errno::result(ret) {
            Ok(_) => {
                buffer.truncate(len);
                return Ok(buffer);
            }
            // The table grew between the two calls
            Err(Errno::ENOMEM) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(Error::route_query(e)),
        }
    }
}

fn candidate(msg: &[u8]) -> Option<GatewayCandidate> {
    let hdr = rt_msghdr(msg)?;
    let Some(interface) = if_indextoname(hdr.rtm_index as u32) else {
        trace!("no interface with index {}", hdr.rtm_index);
        return None;
    };

    let addrs = RouteAddrs::parse(hdr.rtm_addrs, &msg[RT_MSGHDR_LEN..], SOCKADDR_ALIGN);
    if let Some(dst) = addrs.sockaddr(RTA_DST) {
        if !is_wildcard(&dst) {
            return None;
        }
    }
    let gateway = addrs.sockaddr(RTA_GATEWAY)?;

    Some(GatewayCandidate {
        family: gateway.family(),
        gateway: format_sockaddr(&gateway)?,
        interface,
        metric: None,
        table: None,
        eligible: is_unscoped(hdr.rtm_flags),
    })
}
