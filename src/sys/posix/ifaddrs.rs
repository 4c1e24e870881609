use super::raw_sockaddr;
use crate::format::RawSockaddr;
use crate::names::InterfaceNames;
use crate::record::AddressRecord;
use crate::traits::AddressSourceT;
use crate::{AddressTable, Error};
use log::debug;
use nix::ifaddrs::{getifaddrs, InterfaceAddress};
use nix::net::if_::InterfaceFlags;
use nix::sys::socket::{SockaddrLike, SockaddrStorage};

/// Raw copy of a sockaddr from the list, keeping the length the OS declared for it.
fn raw(sa: Option<&SockaddrStorage>) -> Option<RawSockaddr> {
    unsafe { raw_sockaddr(sa?.as_ptr()) }
}

/// Loopback entries report their own address as peer.
fn has_peer(ifa: &InterfaceAddress) -> bool {
    ifa.flags
        .intersects(InterfaceFlags::IFF_POINTOPOINT | InterfaceFlags::IFF_LOOPBACK)
}

pub(crate) struct IfAddrsSource;

impl AddressSourceT for IfAddrsSource {
    fn interfaces() -> Result<Vec<String>, Error> {
        let addrs = getifaddrs().map_err(Error::enumeration)?;

        let mut names = InterfaceNames::default();
        for ifa in addrs {
            names.push(&ifa.interface_name);
        }
        Ok(names.into_vec())
    }

    fn addresses(name: &str) -> Result<AddressTable, Error> {
        let addrs = getifaddrs().map_err(Error::enumeration)?;

        let mut table = AddressTable::new();
        let mut found = false;
        for ifa in addrs.filter(|ifa| ifa.interface_name == name) {
            found = true;

            let Some(address) = raw(ifa.address.as_ref()) else {
                continue;
            };
            // The peer and the broadcast address share one field of the C struct
            let destination = raw(ifa.destination.as_ref().or(ifa.broadcast.as_ref()));

            #[allow(unused_mut)]
            let mut record = AddressRecord::from_sockaddrs(
                Some(&address),
                raw(ifa.netmask.as_ref()).as_ref(),
                destination.as_ref(),
                has_peer(&ifa),
            );

            #[cfg(any(
                target_os = "macos",
                target_os = "ios",
                target_os = "freebsd",
                target_os = "dragonfly"
            ))]
            if address.family() == crate::AddressFamily::INET6 {
                if let Some(sa) = &ifa.address {
                    record.flags = ipv6_flags(name, sa.as_ptr());
                }
            }

            table.push_record(address.family(), record);
        }

        if !found {
            return Err(Error::NoSuchInterface(name.to_owned()));
        }
        debug!("{}: {} address families", name, table.len());
        Ok(table)
    }
}

/// `SIOCGIFAFLAG_IN6` flags of an IPv6 address. Missing flags are not an error.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
fn ipv6_flags(name: &str, addr: *const libc::sockaddr) -> Option<u32> {
    use super::ifreq::in6_ifreq;
    use super::{ioctls, InterfaceName};
    use std::net::{Ipv6Addr, UdpSocket};
    use std::os::unix::io::AsRawFd;

    let name = InterfaceName::try_from(name).ok()?;
    let addr = unsafe { std::ptr::read_unaligned(addr as *const libc::sockaddr_in6) };
    let mut req = in6_ifreq::new(name, addr);

    let socket = match UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)) {
        Ok(socket) => socket,
        Err(e) => {
            debug!("no IPv6 socket for address flags: {}", e);
            return None;
        }
    };

    match unsafe { ioctls::siocgifaflag_in6(socket.as_raw_fd(), &mut req) } {
        Ok(_) => Some(unsafe { req.ifr_ifru.ifru_flags6 } as u32),
        Err(e) => {
            debug!("SIOCGIFAFLAG_IN6 failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loopback_is_listed() {
        let names = IfAddrsSource::interfaces().unwrap();
        assert!(names.iter().any(|name| name.starts_with("lo")), "{:?}", names);
    }

    #[test]
    fn loopback_is_peer() {
        let lo = getifaddrs()
            .unwrap()
            .find(|ifa| ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK))
            .unwrap();
        assert!(has_peer(&lo));
    }

    #[test]
    fn unknown_interface() {
        let err = IfAddrsSource::addresses("nonexistent-if0").unwrap_err();
        assert!(matches!(err, Error::NoSuchInterface(name) if name == "nonexistent-if0"));
    }

    #[test]
    fn families_have_records() {
        for name in IfAddrsSource::interfaces().unwrap() {
            let table = match IfAddrsSource::addresses(&name) {
                Ok(table) => table,
                Err(Error::NoSuchInterface(_)) => {
                    // Only acceptable if the interface went away in between
                    let names = IfAddrsSource::interfaces().unwrap();
                    assert!(!names.contains(&name), "{} listed but not found", name);
                    continue;
                }
                Err(e) => panic!("{}: {}", name, e),
            };
            for (family, records) in table.iter() {
                assert!(!records.is_empty(), "{} {}", name, family);
                assert!(records.iter().all(|r| !r.is_empty()));
            }
        }
    }
}
