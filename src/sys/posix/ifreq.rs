#![allow(non_camel_case_types)]

use super::InterfaceName;
use std::mem;

#[cfg(feature = "ioctl")]
#[repr(C)]
#[derive(Copy, Clone, Default)]
pub(crate) struct ifreq {
    // Read by the kernel only
    #[allow(dead_code)]
    pub(crate) ifr_ifrn: InterfaceName,
    pub(crate) ifr_ifru: ifreq_ifru,
}

cfg_if::cfg_if! {
    if #[cfg(all(feature = "ioctl", any(target_os = "linux", target_os = "android")))] {
        #[repr(C)]
        #[derive(Copy, Clone)]
        pub(crate) union ifreq_ifru {
            pub(crate) ifru_addr: libc::sockaddr,
            pub(crate) ifru_hwaddr: libc::sockaddr,
            pub(crate) ifru_flags: libc::c_short,
            // Largest member, sizes the union
            #[allow(dead_code)]
            ifru_map: ifmap,
        }

        #[repr(C)]
        #[derive(Debug, Copy, Clone, Default)]
        #[allow(dead_code)]
        struct ifmap {
            mem_start: libc::c_ulong,
            mem_end: libc::c_ulong,
            base_addr: libc::c_ushort,
            irq: libc::c_uchar,
            dma: libc::c_uchar,
            port: libc::c_uchar,
        }
    } else if #[cfg(feature = "ioctl")] {
        #[repr(C)]
        #[derive(Copy, Clone)]
        pub(crate) union ifreq_ifru {
            pub(crate) ifru_addr: libc::sockaddr,
            pub(crate) ifru_flags: libc::c_short,
            #[allow(dead_code)]
            ifru_data: *mut libc::c_char,
        }
    }
}

#[cfg(feature = "ioctl")]
impl Default for ifreq_ifru {
    fn default() -> Self {
        unsafe { mem::zeroed() }
    }
}

#[cfg(feature = "ioctl")]
impl ifreq {
    pub(crate) fn new(name: InterfaceName) -> Self {
        ifreq {
            ifr_ifrn: name,
            ..Default::default()
        }
    }
}

/// Argument of `SIOCGIFCONF`: a caller-provided buffer the kernel fills with `ifreq` records.
#[cfg(feature = "ioctl")]
#[repr(C)]
#[cfg_attr(target_vendor = "apple", repr(packed(4)))]
#[derive(Copy, Clone)]
pub(crate) struct ifconf {
    pub(crate) ifc_len: libc::c_int,
    pub(crate) ifc_buf: *mut libc::c_char,
}

/// Argument of `SIOCGIFAFLAG_IN6`.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
#[repr(C)]
#[derive(Copy, Clone)]
pub(crate) struct in6_ifreq {
    #[allow(dead_code)]
    pub(crate) ifr_name: InterfaceName,
    pub(crate) ifr_ifru: in6_ifreq_ifru,
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
#[repr(C)]
#[derive(Copy, Clone)]
pub(crate) union in6_ifreq_ifru {
    pub(crate) ifru_addr: libc::sockaddr_in6,
    pub(crate) ifru_flags6: libc::c_int,
    // in6_ifstat is the largest member
    #[allow(dead_code)]
    ifru_stat: [u64; 34usize],
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
impl in6_ifreq {
    pub(crate) fn new(name: InterfaceName, addr: libc::sockaddr_in6) -> Self {
        let mut req = in6_ifreq {
            ifr_name: name,
            ifr_ifru: unsafe { mem::zeroed() },
        };
        req.ifr_ifru.ifru_addr = addr;
        req
    }
}
