//! Routing socket message layout shared by the sysctl and PF_ROUTE gateway backends.

use crate::format::{RawSockaddr, SOCKADDR_LEN};
use crate::AddressFamily;
use std::net::{Ipv4Addr, Ipv6Addr};

pub(crate) const RTA_DST: i32 = 0x1;
pub(crate) const RTA_GATEWAY: i32 = 0x2;
#[cfg_attr(not(feature = "pf-route"), allow(dead_code))]
pub(crate) const RTA_NETMASK: i32 = 0x4;
#[allow(dead_code)]
pub(crate) const RTA_GENMASK: i32 = 0x8;
#[cfg_attr(not(feature = "pf-route"), allow(dead_code))]
pub(crate) const RTA_IFP: i32 = 0x10;
#[allow(dead_code)]
pub(crate) const RTA_IFA: i32 = 0x20;
const RTAX_MAX: usize = 8;

cfg_if::cfg_if! {
    if #[cfg(target_vendor = "apple")] {
        pub(crate) const SOCKADDR_ALIGN: usize = 4;
    } else {
        pub(crate) const SOCKADDR_ALIGN: usize = std::mem::size_of::<std::os::raw::c_long>();
    }
}

fn round_up(len: usize, align: usize) -> usize {
    if len == 0 {
        align
    } else {
        (len + align - 1) & !(align - 1)
    }
}

/// Splits a route dump into its messages, using the leading `rtm_msglen` of each.
pub(crate) struct RouteMessages<'a> {
    buf: &'a [u8],
    header_len: usize,
}

impl<'a> RouteMessages<'a> {
    pub(crate) fn new(buf: &'a [u8], header_len: usize) -> Self {
        Self { buf, header_len }
    }
}

impl<'a> Iterator for RouteMessages<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.len() < self.header_len {
            return None;
        }
        let msglen = u16::from_ne_bytes([self.buf[0], self.buf[1]]) as usize;
        if msglen < self.header_len || msglen > self.buf.len() {
            return None;
        }
        let (msg, rest) = self.buf.split_at(msglen);
        self.buf = rest;
        Some(msg)
    }
}

/// The sockaddrs following a routing message header, by `RTA_*` bit.
///
/// The kernel only writes the sockaddrs whose bit is set in `rtm_addrs`, in bit order, each
/// padded to the platform alignment. A zero-length sockaddr still takes one alignment unit.
#[derive(Debug)]
pub(crate) struct RouteAddrs<'a> {
    slots: [Option<&'a [u8]>; RTAX_MAX],
}

impl<'a> RouteAddrs<'a> {
    pub(crate) fn parse(addrs: i32, mut bytes: &'a [u8], align: usize) -> Self {
        let mut slots = [None; RTAX_MAX];
        let mut remaining = addrs as u32 & ((1 << RTAX_MAX) - 1);

        while remaining != 0 && bytes.len() >= SOCKADDR_LEN {
            let sa_len = bytes[0] as usize;
            let len = round_up(sa_len, align);
            if len > bytes.len() {
                break;
            }

            let slot = remaining.trailing_zeros() as usize;
            remaining &= remaining - 1;
            slots[slot] = Some(&bytes[..sa_len]);
            bytes = &bytes[len..];
        }

        Self { slots }
    }

    pub(crate) fn get(&self, rta: i32) -> Option<&'a [u8]> {
        self.slots[rta.trailing_zeros() as usize]
    }

    pub(crate) fn sockaddr(&self, rta: i32) -> Option<RawSockaddr> {
        sockaddr(self.get(rta)?)
    }
}

/// A routing socket sockaddr: length byte, family byte, payload.
pub(crate) fn sockaddr(sa: &[u8]) -> Option<RawSockaddr> {
    let family = *sa.get(1)?;
    Some(RawSockaddr::new(
        AddressFamily::from_raw(family as i32),
        sa.to_vec(),
    ))
}

/// Whether `sa` is the IPv4 or IPv6 any-address.
pub(crate) fn is_wildcard(sa: &RawSockaddr) -> bool {
    match sa.family() {
        AddressFamily::INET => sa.ipv4() == Some(Ipv4Addr::UNSPECIFIED),
        AddressFamily::INET6 => sa.ipv6().map(|(ip, _)| ip) == Some(Ipv6Addr::UNSPECIFIED),
        _ => false,
    }
}

/// Interface index and name carried by a `sockaddr_dl`.
#[cfg_attr(not(feature = "pf-route"), allow(dead_code))]
pub(crate) fn link_name(sdl: &RawSockaddr) -> (u16, Option<String>) {
    let sdl = sdl.canonical();
    let index = u16::from_ne_bytes([sdl[2], sdl[3]]);
    let nlen = sdl[5] as usize;
    let name = sdl
        .get(8..8 + nlen)
        .filter(|name| !name.is_empty())
        .and_then(|name| std::str::from_utf8(name).ok())
        .map(str::to_owned);
    (index, name)
}

#[cfg(test)]
mod test {
    use super::*;

    fn sa_in(addr: [u8; 4]) -> Vec<u8> {
        let mut sa = vec![0u8; 16];
        sa[0] = 16;
        sa[1] = AddressFamily::INET.raw() as u8;
        sa[4..8].copy_from_slice(&addr);
        sa
    }

    #[test]
    fn addresses_in_bit_order() {
        let mut bytes = sa_in([0, 0, 0, 0]);
        bytes.extend(sa_in([192, 168, 1, 1]));
        bytes.extend(sa_in([0, 0, 0, 0]));

        let addrs = RouteAddrs::parse(RTA_DST | RTA_GATEWAY | RTA_NETMASK, &bytes, 4);
        assert!(is_wildcard(&addrs.sockaddr(RTA_DST).unwrap()));
        let gateway = addrs.sockaddr(RTA_GATEWAY).unwrap();
        assert_eq!(gateway.ipv4(), Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert!(addrs.get(RTA_NETMASK).is_some());
        assert!(addrs.get(RTA_IFP).is_none());
    }

    #[test]
    fn absent_bits_are_skipped() {
        let mut bytes = sa_in([0, 0, 0, 0]);
        bytes.extend(sa_in([10, 0, 0, 1]));

        let addrs = RouteAddrs::parse(RTA_DST | RTA_IFP, &bytes, 4);
        assert!(addrs.get(RTA_GATEWAY).is_none());
        let ifp = addrs.sockaddr(RTA_IFP).unwrap();
        assert_eq!(ifp.ipv4(), Some(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn zero_length_takes_one_unit() {
        // DST is empty, then GATEWAY
        let mut bytes = vec![0u8; 8];
        bytes.extend(sa_in([192, 168, 1, 1]));

        let addrs = RouteAddrs::parse(RTA_DST | RTA_GATEWAY, &bytes, 8);
        assert_eq!(addrs.get(RTA_DST), Some(&[][..]));
        let gateway = addrs.sockaddr(RTA_GATEWAY).unwrap();
        assert_eq!(gateway.ipv4(), Some(Ipv4Addr::new(192, 168, 1, 1)));
    }

    #[test]
    fn short_sockaddrs_are_padded() {
        // A truncated netmask of 5 bytes occupies 8 bytes with 4- and 8-byte alignment
        let mut netmask = vec![5u8, AddressFamily::INET.raw() as u8, 0, 0, 255, 0, 0, 0];
        netmask.extend(sa_in([10, 0, 0, 1]));

        for align in [4, 8] {
            let addrs = RouteAddrs::parse(RTA_NETMASK | RTA_IFA, &netmask, align);
            let mask = addrs.sockaddr(RTA_NETMASK).unwrap();
            assert_eq!(mask.ipv4(), Some(Ipv4Addr::new(255, 0, 0, 0)));
            let ifa = addrs.sockaddr(RTA_IFA).unwrap();
            assert_eq!(ifa.ipv4(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        }
    }

    #[test]
    fn overrun_stops_walk() {
        let mut bytes = sa_in([0, 0, 0, 0]);
        bytes[0] = 64;
        let addrs = RouteAddrs::parse(RTA_DST, &bytes, 4);
        assert!(addrs.get(RTA_DST).is_none());
    }

    #[test]
    fn non_wildcard_destination() {
        let dst = sockaddr(&sa_in([10, 0, 0, 0])).unwrap();
        assert!(!is_wildcard(&dst));
        assert!(!is_wildcard(&RawSockaddr::new(AddressFamily::LINK, vec![0; 20])));
    }

    #[test]
    fn split_messages() {
        let mut dump = vec![];
        for len in [24u16, 32] {
            let mut msg = vec![0u8; len as usize];
            msg[..2].copy_from_slice(&len.to_ne_bytes());
            dump.extend(msg);
        }
        let lens: Vec<_> = RouteMessages::new(&dump, 16).map(<[u8]>::len).collect();
        assert_eq!(lens, vec![24, 32]);
    }

    #[test]
    fn truncated_message_ends_dump() {
        let mut dump = vec![0u8; 20];
        dump[..2].copy_from_slice(&64u16.to_ne_bytes());
        assert_eq!(RouteMessages::new(&dump, 16).count(), 0);
    }

    #[test]
    fn link_name_from_sockaddr_dl() {
        let mut sdl = vec![0u8; 20];
        sdl[0] = 20;
        sdl[1] = 18;
        sdl[2..4].copy_from_slice(&4u16.to_ne_bytes());
        sdl[5] = 3;
        sdl[8..11].copy_from_slice(b"en0");
        let (index, name) = link_name(&RawSockaddr::new(AddressFamily::LINK, sdl));
        assert_eq!(index, 4);
        assert_eq!(name.as_deref(), Some("en0"));
    }
}
