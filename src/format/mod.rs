mod netmask;
mod sockaddr;

pub(crate) use netmask::format_netmask;
pub(crate) use sockaddr::{format_sockaddr, RawSockaddr};

#[cfg(test)]
pub(crate) use sockaddr::{inet, inet6};

#[cfg(target_os = "windows")]
pub(crate) use netmask::format_cidr;

#[cfg(any(
    target_os = "windows",
    all(feature = "ioctl", any(target_os = "linux", target_os = "android"))
))]
pub(crate) use sockaddr::format_hex;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) use sockaddr::format_ip_bytes;

#[cfg(all(
    unix,
    not(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd",
        target_os = "openbsd"
    ))
))]
pub(crate) use sockaddr::canonical_len;

#[cfg(feature = "ioctl")]
pub(crate) use sockaddr::HAS_SA_LEN;

#[cfg(any(
    test,
    feature = "ioctl",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
pub(crate) use sockaddr::SOCKADDR_LEN;
