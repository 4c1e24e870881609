use super::ifconf::{IfconfLayout, IfconfRecords};
use super::ifreq::{ifconf, ifreq};
use super::{dummy_socket, ioctls, raw_sockaddr, InterfaceName};
use crate::format::{RawSockaddr, HAS_SA_LEN};
use crate::names::InterfaceNames;
use crate::record::AddressRecord;
use crate::traits::AddressSourceT;
use crate::{AddressFamily, AddressTable, Error};
use log::{debug, trace};
use std::mem;
use std::os::unix::io::{AsRawFd, RawFd};

/// Initial `SIOCGIFCONF` buffer size, in `ifreq` records.
const IFREQ_GUESS: usize = 64;
const IFREQ_MAX: usize = IFREQ_GUESS << 10;

type IfreqIoctl = unsafe fn(libc::c_int, *mut ifreq) -> nix::Result<libc::c_int>;

/// Fills a `SIOCGIFCONF` buffer, growing it until the kernel leaves room to spare.
fn interface_config(fd: RawFd) -> Result<Vec<u8>, Error> {
    let ifreq_len = mem::size_of::<ifreq>();
    let mut entries = IFREQ_GUESS;
    loop {
        let len = entries * ifreq_len;
        let mut buffer: Vec<u8> = Vec::new();
        buffer.try_reserve_exact(len)?;
        buffer.resize(len, 0);

        let mut ifc = ifconf {
            ifc_len: len as libc::c_int,
            ifc_buf: buffer.as_mut_ptr() as *mut libc::c_char,
        };
        unsafe { ioctls::siocgifconf(fd, &mut ifc) }.map_err(Error::enumeration)?;

        let used = ifc.ifc_len as usize;
        // The kernel stops at the last record that fits, so a full buffer may be truncated
        if used + ifreq_len > len && entries < IFREQ_MAX {
            trace!("SIOCGIFCONF filled {} of {} bytes, retrying", used, len);
            entries *= 2;
            continue;
        }

        buffer.truncate(used.min(len));
        return Ok(buffer);
    }
}

fn query(fd: RawFd, name: InterfaceName, ioctl: IfreqIoctl) -> Option<ifreq> {
    let mut req = ifreq::new(name);
    match unsafe { ioctl(fd, &mut req) } {
        Ok(_) => Some(req),
        Err(e) => {
            trace!("ifreq ioctl failed: {}", e);
            None
        }
    }
}

fn sockaddr_of(req: &ifreq) -> Option<RawSockaddr> {
    unsafe { raw_sockaddr(&req.ifr_ifru.ifru_addr) }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn hardware_address(req: &ifreq) -> Option<String> {
    let sa = unsafe { req.ifr_ifru.ifru_hwaddr };
    let data: Vec<u8> = sa.sa_data.iter().map(|b| *b as u8).collect();
    let len = match sa.sa_family {
        libc::ARPHRD_ETHER | libc::ARPHRD_IEEE802 => 6,
        _ => data.len(),
    };
    crate::format::format_hex(&data[..len])
}

pub(crate) struct IoctlSource;

impl AddressSourceT for IoctlSource {
    fn interfaces() -> Result<Vec<String>, Error> {
        let socket = dummy_socket().map_err(Error::enumeration)?;
        let buffer = interface_config(socket.as_raw_fd())?;

        let layout = IfconfLayout {
            ifreq_len: mem::size_of::<ifreq>(),
            sa_len: HAS_SA_LEN,
        };
        let mut names = InterfaceNames::default();
        for name in IfconfRecords::new(&buffer, layout).filter_map(|r| r.name()) {
            names.push(name);
        }
        Ok(names.into_vec())
    }

    fn addresses(name: &str) -> Result<AddressTable, Error> {
        // A name that does not fit an ifreq cannot belong to an interface
        let ifname = InterfaceName::try_from(name)
            .map_err(|_| Error::NoSuchInterface(name.to_owned()))?;
        let socket = dummy_socket().map_err(Error::enumeration)?;
        let fd = socket.as_raw_fd();

        let mut table = AddressTable::new();
        let mut found = false;

        #[cfg(any(target_os = "linux", target_os = "android"))]
        if let Some(req) = query(fd, ifname, ioctls::siocgifhwaddr) {
            found = true;
            if let Some(hwaddr) = hardware_address(&req) {
                let record = AddressRecord {
                    address: Some(hwaddr),
                    ..Default::default()
                };
                table.push_record(AddressFamily::LINK, record);
            }
        }

        let address = query(fd, ifname, ioctls::siocgifaddr).and_then(|req| {
            found = true;
            sockaddr_of(&req)
        });
        let netmask = query(fd, ifname, ioctls::siocgifnetmask).and_then(|req| sockaddr_of(&req));

        let flags = query(fd, ifname, ioctls::siocgifflags).map(|req| {
            found = true;
            (unsafe { req.ifr_ifru.ifru_flags }) as libc::c_int
        });
        let peer = flags.map_or(false, |f| f & (libc::IFF_POINTOPOINT | libc::IFF_LOOPBACK) != 0);

        let destination = if peer {
            query(fd, ifname, ioctls::siocgifdstaddr)
        } else {
            query(fd, ifname, ioctls::siocgifbrdaddr)
        }
        .and_then(|req| sockaddr_of(&req));

        if !found {
            return Err(Error::NoSuchInterface(name.to_owned()));
        }

        let family = address
            .as_ref()
            .map_or(AddressFamily::INET, RawSockaddr::family);
        let record = AddressRecord::from_sockaddrs(
            address.as_ref(),
            netmask.as_ref(),
            destination.as_ref(),
            peer,
        );
        table.push_record(family, record);

        debug!("{}: {} address families", name, table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loopback_has_ipv4() {
        let names = IoctlSource::interfaces().unwrap();
        let lo = names.iter().find(|n| n.starts_with("lo")).unwrap();
        let table = IoctlSource::addresses(lo).unwrap();
        let records = table.get(AddressFamily::INET).unwrap();
        assert_eq!(records[0].address.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn listed_interfaces_resolve() {
        for name in IoctlSource::interfaces().unwrap() {
            match IoctlSource::addresses(&name) {
                Ok(_) => {}
                Err(Error::NoSuchInterface(_)) => {
                    let names = IoctlSource::interfaces().unwrap();
                    assert!(!names.contains(&name), "{} listed but not found", name);
                }
                Err(e) => panic!("{}: {}", name, e),
            }
        }
    }

    #[test]
    fn name_too_long() {
        let err = IoctlSource::addresses("an-interface-name-too-long").unwrap_err();
        assert!(matches!(err, Error::NoSuchInterface(_)));
    }
}
