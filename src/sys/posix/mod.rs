mod ifacename;
pub(crate) mod ifaddrs;
#[cfg(any(test, feature = "ioctl"))]
mod ifconf;
#[cfg(any(
    feature = "ioctl",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
mod ifreq;
#[cfg(feature = "ioctl")]
pub(crate) mod ioctl;
#[cfg(any(
    feature = "ioctl",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
mod ioctls;

pub(crate) use ifacename::InterfaceName;

use crate::format::RawSockaddr;
use crate::AddressFamily;
use std::net::{Ipv4Addr, UdpSocket};
use std::{io, slice};

pub(crate) fn if_indextoname(index: u32) -> Option<String> {
    let mut buf = InterfaceName::default();
    let ret_buf = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };

    if ret_buf.is_null() {
        return None;
    }

    String::try_from(&buf).ok()
}

/// Interface name for an IPv6 scope id, or the number itself if no interface has it.
pub(crate) fn scope_name(scope_id: u32) -> String {
    if_indextoname(scope_id).unwrap_or_else(|| scope_id.to_string())
}

/// Copies the sockaddr at `ptr`, keeping only the bytes the OS declared for it.
///
/// # Safety
///
/// `ptr` must be null or point to a sockaddr readable for its declared length.
pub(crate) unsafe fn raw_sockaddr(ptr: *const libc::sockaddr) -> Option<RawSockaddr> {
    let sa = ptr.as_ref()?;
    let family = AddressFamily::from_raw(sa.sa_family as i32);

    cfg_if::cfg_if! {
        if #[cfg(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "dragonfly",
            target_os = "netbsd",
            target_os = "openbsd"
        ))] {
            let len = sa.sa_len as usize;
        } else {
            let len = crate::format::canonical_len(family);
        }
    }

    let bytes = slice::from_raw_parts(ptr as *const u8, len);
    Some(RawSockaddr::new(family, bytes.to_vec()))
}

/// Any socket will do as a handle for interface ioctls.
#[cfg_attr(not(feature = "ioctl"), allow(dead_code))]
pub(crate) fn dummy_socket() -> io::Result<UdpSocket> {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
}
