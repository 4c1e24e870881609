use super::{is_unscoped, rt_msghdr, RT_MSGHDR_LEN};
use crate::format::format_sockaddr;
use crate::gateway::{select_defaults, GatewayCandidate};
use crate::sys::posix::if_indextoname;
use crate::sys::rtmsg::{
    is_wildcard, link_name, RouteAddrs, RTA_DST, RTA_GATEWAY, RTA_IFP, RTA_NETMASK,
    SOCKADDR_ALIGN,
};
use crate::traits::GatewaySourceT;
use crate::{AddressFamily, Error, GatewayTable};
use log::{debug, trace};
use nix::errno::Errno;
use nix::sys::socket::{self, MsgFlags, SockFlag, SockType};
use nix::unistd::{self, SysconfVar};
use std::io;
use std::os::unix::io::RawFd;
use std::{mem, slice};

const MIN_BUFFER_LEN: usize = 8192;

/// Asks the kernel for the route to the any-address of each family with `RTM_GET` messages
/// on a `PF_ROUTE` socket. Yields at most a handful of gateways, since the table itself is
/// never read.
pub(crate) struct PfRouteSource;

impl GatewaySourceT for PfRouteSource {
    fn gateways() -> Result<GatewayTable, Error> {
        let fd = socket::socket(
            socket::AddressFamily::Route,
            SockType::Raw,
            SockFlag::empty(),
            None,
        )
        .map_err(Error::route_query)?;
        let fd = scopeguard::guard(fd, |fd| {
            let _ = unistd::close(fd);
        });

        let mut exchange = Exchange {
            fd: *fd,
            pid: unistd::getpid().as_raw(),
            seq: 0,
            buffer: vec![0; buffer_len()],
        };

        let mut candidates = inet_gateways(&mut exchange)?;
        candidates.extend(inet6_gateways(&mut exchange)?);
        Ok(select_defaults(candidates))
    }
}

fn buffer_len() -> usize {
    match unistd::sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(pagesize)) => (pagesize as usize).max(MIN_BUFFER_LEN),
        _ => MIN_BUFFER_LEN,
    }
}

/// One routing socket conversation: requests go out with increasing sequence numbers and
/// only replies carrying our pid and the current sequence number are read back.
struct Exchange {
    fd: RawFd,
    pid: libc::pid_t,
    seq: libc::c_int,
    buffer: Vec<u8>,
}

impl Exchange {
    /// Sends an `RTM_GET` request. Returns `false` if the kernel has no matching route.
    fn send(&mut self, mut msg: Vec<u8>) -> Result<bool, Error> {
        self.seq += 1;

        let mut hdr: libc::rt_msghdr = unsafe { mem::zeroed() };
        hdr.rtm_msglen = msg.len() as u16;
        hdr.rtm_version = libc::RTM_VERSION as u8;
        hdr.rtm_type = libc::RTM_GET as u8;
        hdr.rtm_flags = libc::RTF_UP | libc::RTF_GATEWAY;
        hdr.rtm_addrs = RTA_DST | RTA_NETMASK | RTA_IFP;
        hdr.rtm_seq = self.seq;
        let hdr_bytes =
            unsafe { slice::from_raw_parts(&hdr as *const _ as *const u8, RT_MSGHDR_LEN) };
        msg[..RT_MSGHDR_LEN].copy_from_slice(hdr_bytes);

        loop {
            match unistd::write(self.fd, &msg) {
                Ok(_) => return Ok(true),
                Err(Errno::EINTR) => continue,
                Err(Errno::ESRCH) => return Ok(false),
                Err(e) => return Err(Error::route_query(e)),
            }
        }
    }

    /// Waits for the reply to the last request. `None` means the kernel has no matching route.
    fn receive(&mut self) -> Result<Option<&[u8]>, Error> {
        let len = loop {
            let len = match socket::recv(self.fd, &mut self.buffer, MsgFlags::empty()) {
                Ok(len) => len,
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(Error::route_query(e)),
            };
            let Some(hdr) = rt_msghdr(&self.buffer[..len]) else {
                continue;
            };
            // Routing sockets see every change on the system
            if hdr.rtm_seq != self.seq || hdr.rtm_pid != self.pid {
                continue;
            }
            match hdr.rtm_errno {
                0 => break len.min(hdr.rtm_msglen as usize),
                libc::ESRCH => return Ok(None),
                errno => return Err(Error::RouteQuery(io::Error::from_raw_os_error(errno))),
            }
        };
        Ok(Some(&self.buffer[..len]))
    }
}

/// Header space followed by zeroed sockaddrs of the given families and lengths.
fn request(sockaddrs: &[(AddressFamily, usize)]) -> Vec<u8> {
    let mut msg = vec![0u8; RT_MSGHDR_LEN];
    for (family, len) in sockaddrs {
        let start = msg.len();
        let padded = (len + SOCKADDR_ALIGN - 1) & !(SOCKADDR_ALIGN - 1);
        msg.resize(start + padded, 0);
        msg[start] = *len as u8;
        msg[start + 1] = family.raw() as u8;
    }
    msg
}

fn interface_of(ifp: &crate::format::RawSockaddr) -> Option<String> {
    let (index, name) = link_name(ifp);
    if index != 0 {
        if_indextoname(index as u32)
    } else {
        name
    }
}

fn inet_gateways(exchange: &mut Exchange) -> Result<Vec<GatewayCandidate>, Error> {
    let msg = request(&[
        (AddressFamily::INET, mem::size_of::<libc::sockaddr_in>()),
        (AddressFamily::INET, mem::size_of::<libc::sockaddr_in>()),
        (AddressFamily::LINK, mem::size_of::<libc::sockaddr_dl>()),
    ]);
    if !exchange.send(msg)? {
        debug!("no IPv4 default route");
        return Ok(vec![]);
    }

    let mut candidates = vec![];
    loop {
        let Some(reply) = exchange.receive()? else {
            break;
        };
        let Some(hdr) = rt_msghdr(reply) else {
            break;
        };
        let addrs = RouteAddrs::parse(hdr.rtm_addrs, &reply[RT_MSGHDR_LEN..], SOCKADDR_ALIGN);
        let mut dst = addrs.sockaddr(RTA_DST);
        let mut gw = addrs.sockaddr(RTA_GATEWAY);
        let mut ifp = addrs.sockaddr(RTA_IFP);

        if dst.as_ref().map_or(false, |sa| sa.family() != AddressFamily::INET)
            || gw.as_ref().map_or(false, |sa| sa.family() != AddressFamily::INET)
            || ifp.as_ref().map_or(false, |sa| sa.family() != AddressFamily::LINK)
        {
            dst = None;
            gw = None;
            ifp = None;
        }
        if dst.as_ref().map_or(false, is_wildcard) {
            dst = None;
        }

        if let (None, Some(gw), Some(ifp)) = (dst, gw, ifp) {
            match (interface_of(&ifp), format_sockaddr(&gw)) {
                (Some(interface), Some(gateway)) => candidates.push(GatewayCandidate {
                    family: AddressFamily::INET,
                    gateway,
                    interface,
                    metric: None,
                    table: None,
                    eligible: is_unscoped(hdr.rtm_flags),
                }),
                _ => trace!("unusable IPv4 RTM_GET reply"),
            }
        }

        if hdr.rtm_flags & libc::RTF_DONE != 0 {
            break;
        }
    }
    Ok(candidates)
}

fn inet6_gateways(exchange: &mut Exchange) -> Result<Vec<GatewayCandidate>, Error> {
    let msg = request(&[
        (AddressFamily::INET6, mem::size_of::<libc::sockaddr_in6>()),
        (AddressFamily::INET6, mem::size_of::<libc::sockaddr_in6>()),
        (AddressFamily::LINK, mem::size_of::<libc::sockaddr_dl>()),
    ]);
    if !exchange.send(msg)? {
        debug!("no IPv6 default route");
        return Ok(vec![]);
    }

    let mut candidates = vec![];
    loop {
        let Some(reply) = exchange.receive()? else {
            break;
        };
        let Some(hdr) = rt_msghdr(reply) else {
            break;
        };
        let addrs = RouteAddrs::parse(hdr.rtm_addrs, &reply[RT_MSGHDR_LEN..], SOCKADDR_ALIGN);
        let mut dst = addrs.sockaddr(RTA_DST);
        let mut gw = addrs.sockaddr(RTA_GATEWAY);
        let mut ifp = addrs.sockaddr(RTA_IFP);

        if dst.as_ref().map_or(false, |sa| sa.family() != AddressFamily::INET6)
            || gw.as_ref().map_or(false, |sa| sa.family() != AddressFamily::INET6)
            || ifp.as_ref().map_or(false, |sa| sa.family() != AddressFamily::LINK)
        {
            dst = None;
            gw = None;
            ifp = None;
        }
        if dst.as_ref().map_or(false, is_wildcard) {
            dst = None;
        }

        if let (None, Some(gw), Some(ifp)) = (dst, gw, ifp) {
            match (interface_of(&ifp), format_sockaddr(&gw)) {
                (Some(interface), Some(gateway)) => candidates.push(GatewayCandidate {
                    family: AddressFamily::INET6,
                    gateway,
                    interface,
                    metric: None,
                    table: None,
                    eligible: is_unscoped(hdr.rtm_flags),
                }),
                _ => trace!("unusable IPv6 RTM_GET reply"),
            }
        }

        if hdr.rtm_flags & libc::RTF_DONE != 0 {
            break;
        }
    }
    Ok(candidates)
}
