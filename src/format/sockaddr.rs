use crate::AddressFamily;
use std::borrow::Cow;
use std::fmt::Write;
use std::net::{Ipv4Addr, Ipv6Addr};

cfg_if::cfg_if! {
    if #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd",
        target_os = "openbsd"
    ))] {
        /// Sockaddrs start with a length byte followed by a one-byte family.
        pub(crate) const HAS_SA_LEN: bool = true;
        const LINK_CANONICAL_LEN: usize = std::mem::size_of::<libc::sockaddr_dl>();
    } else if #[cfg(any(target_os = "linux", target_os = "android"))] {
        pub(crate) const HAS_SA_LEN: bool = false;
        const LINK_CANONICAL_LEN: usize = std::mem::size_of::<libc::sockaddr_ll>();
    } else {
        pub(crate) const HAS_SA_LEN: bool = false;
        const LINK_CANONICAL_LEN: usize = SOCKADDR_LEN;
    }
}

pub(crate) const SOCKADDR_LEN: usize = 16;
const SOCKADDR_IN_LEN: usize = 16;
const SOCKADDR_IN6_LEN: usize = 28;
const SOCKADDR_HEADER_LEN: usize = 2;

/// Size of the rendering buffer, terminator included. Hex renderings that do not fit fail.
const RENDER_BUFFER_LEN: usize = 256;

/// A socket address as handed out by the OS: its family plus exactly the bytes the OS
/// declared for it, which may be fewer than the family's structure needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RawSockaddr {
    family: AddressFamily,
    bytes: Vec<u8>,
}

impl RawSockaddr {
    pub(crate) fn new(family: AddressFamily, bytes: Vec<u8>) -> Self {
        Self { family, bytes }
    }

    pub(crate) fn family(&self) -> AddressFamily {
        self.family
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn canonical(&self) -> Cow<'_, [u8]> {
        canonicalize(&self.bytes, self.family)
    }

    pub(crate) fn ipv4(&self) -> Option<Ipv4Addr> {
        if self.family != AddressFamily::INET {
            return None;
        }
        let sa = self.canonical();
        let octets: [u8; 4] = sa[4..8].try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    /// Address and scope id of an `AF_INET6` sockaddr.
    pub(crate) fn ipv6(&self) -> Option<(Ipv6Addr, u32)> {
        if self.family != AddressFamily::INET6 {
            return None;
        }
        let sa = self.canonical();
        let octets: [u8; 16] = sa[8..24].try_into().ok()?;
        let scope_id = u32::from_ne_bytes(sa[24..28].try_into().ok()?);
        Some(unembed_scope(octets, scope_id))
    }
}

/// Structure size the OS uses for `family`.
pub(crate) fn canonical_len(family: AddressFamily) -> usize {
    match family {
        AddressFamily::INET => SOCKADDR_IN_LEN,
        AddressFamily::INET6 => SOCKADDR_IN6_LEN,
        AddressFamily::LINK => LINK_CANONICAL_LEN,
        _ => SOCKADDR_LEN,
    }
}

/// Zero-extends a truncated sockaddr to the canonical size of its family.
///
/// Some kernels hand out netmasks that stop after the last non-zero byte. Only the bytes
/// that were declared are copied; on platforms with a length byte it is rewritten to the
/// canonical size.
pub(crate) fn canonicalize(bytes: &[u8], family: AddressFamily) -> Cow<'_, [u8]> {
    let len = canonical_len(family);
    if bytes.len() >= len {
        return Cow::Borrowed(bytes);
    }

    let mut repaired = vec![0u8; len];
    repaired[..bytes.len()].copy_from_slice(bytes);
    if HAS_SA_LEN {
        repaired[0] = len as u8;
        repaired[1] = family.raw() as u8;
    } else if bytes.len() < SOCKADDR_HEADER_LEN {
        repaired[..2].copy_from_slice(&(family.raw() as u16).to_ne_bytes());
    }
    Cow::Owned(repaired)
}

/// Renders a sockaddr as text.
///
/// IPv4 and IPv6 addresses are rendered numerically, IPv6 with a `%scope` suffix when the
/// scope id is set. Link-layer addresses become colon-separated hex octets and any other
/// family falls back to a hex dump of its payload. `AF_UNSPEC` and empty renderings yield
/// `None`.
pub(crate) fn format_sockaddr(sa: &RawSockaddr) -> Option<String> {
    match sa.family {
        AddressFamily::UNSPEC => None,
        AddressFamily::INET => sa.ipv4().map(|ip| ip.to_string()),
        AddressFamily::INET6 => sa.ipv6().map(|(ip, scope_id)| format_ipv6(ip, scope_id)),
        AddressFamily::LINK => format_hex(link_layer_bytes(&sa.canonical())?),
        _ => format_hex(sa.bytes.get(SOCKADDR_HEADER_LEN..)?),
    }
}

/// Renders raw address bytes (4 or 16 of them), as found in routing messages.
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
pub(crate) fn format_ip_bytes(bytes: &[u8]) -> Option<String> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Some(Ipv4Addr::from(octets).to_string());
    }
    let octets = <[u8; 16]>::try_from(bytes).ok()?;
    Some(Ipv6Addr::from(octets).to_string())
}

/// Colon-separated lowercase hex octets, or `None` if empty or too long to render.
pub(crate) fn format_hex(data: &[u8]) -> Option<String> {
    if data.is_empty() || 3 * data.len() > RENDER_BUFFER_LEN {
        return None;
    }

    let mut out = String::with_capacity(3 * data.len());
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    Some(out)
}

fn format_ipv6(ip: Ipv6Addr, scope_id: u32) -> String {
    if scope_id == 0 {
        return ip.to_string();
    }

    let segment = ip.segments()[0];
    let link_scoped = segment & 0xffc0 == 0xfe80 || segment & 0xff0f == 0xff02;
    if link_scoped {
        format!("{}%{}", ip, crate::sys::scope_name(scope_id))
    } else {
        format!("{}%{}", ip, scope_id)
    }
}

/// Hardware address carried by a link-layer sockaddr, bounded by the bytes present.
fn link_layer_bytes(sa: &[u8]) -> Option<&[u8]> {
    cfg_if::cfg_if! {
        if #[cfg(any(target_os = "linux", target_os = "android"))] {
            // sockaddr_ll: sll_halen at 11, sll_addr at 12
            let len = *sa.get(11)? as usize;
            let start: usize = 12;
        } else if #[cfg(target_os = "windows")] {
            let len: usize = 0;
            let start: usize = sa.len();
        } else {
            // sockaddr_dl: sdl_nlen at 5, sdl_alen at 6, sdl_data at 8, address after the name
            let len = *sa.get(6)? as usize;
            let start: usize = 8 + *sa.get(5)? as usize;
        }
    }
    let end = start.checked_add(len)?.min(sa.len());
    sa.get(start..end)
}

/// KAME stacks embed the scope of link-local addresses in the second 16-bit word.
fn unembed_scope(mut octets: [u8; 16], scope_id: u32) -> (Ipv6Addr, u32) {
    if !HAS_SA_LEN {
        return (Ipv6Addr::from(octets), scope_id);
    }

    let link_local = octets[0] == 0xfe && octets[1] & 0xc0 == 0x80;
    let multicast = octets[0] == 0xff && matches!(octets[1] & 0x0f, 0x01 | 0x02);
    let embedded = u16::from_be_bytes([octets[2], octets[3]]);
    if (link_local || multicast) && embedded != 0 {
        octets[2] = 0;
        octets[3] = 0;
        let scope_id = if scope_id == 0 {
            embedded as u32
        } else {
            scope_id
        };
        return (Ipv6Addr::from(octets), scope_id);
    }
    (Ipv6Addr::from(octets), scope_id)
}

#[cfg(test)]
pub(crate) fn inet(octets: [u8; 4]) -> RawSockaddr {
    let mut bytes = vec![0u8; SOCKADDR_IN_LEN];
    bytes[4..8].copy_from_slice(&octets);
    RawSockaddr::new(AddressFamily::INET, bytes)
}

#[cfg(test)]
pub(crate) fn inet6(octets: [u8; 16], scope_id: u32) -> RawSockaddr {
    let mut bytes = vec![0u8; SOCKADDR_IN6_LEN];
    bytes[8..24].copy_from_slice(&octets);
    bytes[24..28].copy_from_slice(&scope_id.to_ne_bytes());
    RawSockaddr::new(AddressFamily::INET6, bytes)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn ipv4() {
        assert_eq!(
            format_sockaddr(&inet([192, 168, 1, 10])).as_deref(),
            Some("192.168.1.10")
        );
    }

    #[test]
    fn ipv6_without_scope() {
        let ip: Ipv6Addr = "2001:db8::1".parse().unwrap();
        assert_eq!(
            format_sockaddr(&inet6(ip.octets(), 0)).as_deref(),
            Some("2001:db8::1")
        );
    }

    #[test]
    fn ipv6_global_scope_is_numeric() {
        let ip: Ipv6Addr = "2001:db8::1".parse().unwrap();
        assert_eq!(
            format_sockaddr(&inet6(ip.octets(), 7)).as_deref(),
            Some("2001:db8::1%7")
        );
    }

    #[test]
    fn ipv6_link_local_has_scope_suffix() {
        let ip: Ipv6Addr = "fe80::1".parse().unwrap();
        let rendered = format_sockaddr(&inet6(ip.octets(), 1)).unwrap();
        assert!(rendered.starts_with("fe80::1%"), "{}", rendered);
        assert!(rendered.len() > "fe80::1%".len());
    }

    #[test]
    fn unspec_is_rejected() {
        let sa = RawSockaddr::new(AddressFamily::UNSPEC, vec![0; 16]);
        assert_eq!(format_sockaddr(&sa), None);
    }

    #[test]
    fn truncated_netmask_is_repaired() {
        let mut bytes = vec![0u8; 5];
        bytes[4] = 255;
        let sa = RawSockaddr::new(AddressFamily::INET, bytes);
        assert_eq!(sa.canonical().len(), 16);
        assert_eq!(format_sockaddr(&sa).as_deref(), Some("255.0.0.0"));
    }

    #[test]
    fn empty_sockaddr_is_all_zeroes() {
        let sa = RawSockaddr::new(AddressFamily::INET, vec![]);
        assert_eq!(format_sockaddr(&sa).as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn canonical_sockaddr_is_borrowed() {
        let sa = inet([10, 0, 0, 1]);
        assert!(matches!(sa.canonical(), Cow::Borrowed(_)));
    }

    #[test]
    fn unknown_family_is_hex_dump() {
        let family = AddressFamily::from_raw(99);
        let sa = RawSockaddr::new(family, vec![0, 0, 0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(format_sockaddr(&sa).as_deref(), Some("de:ad:be:ef"));
    }

    #[test]
    fn hex_of_k_bytes() {
        let data = [0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e];
        let rendered = format_hex(&data).unwrap();
        assert_eq!(rendered, "00:1a:2b:3c:4d:5e");
        assert_eq!(rendered.len(), 3 * data.len() - 1);
    }

    #[test]
    fn hex_limits() {
        assert_eq!(format_hex(&[]), None);
        assert!(format_hex(&[0xab; 85]).is_some());
        assert_eq!(format_hex(&[0xab; 86]), None);
    }

    #[test]
    fn raw_ip_bytes() {
        assert_eq!(format_ip_bytes(&[10, 0, 0, 1]).as_deref(), Some("10.0.0.1"));
        let ip: Ipv6Addr = "fe80::1".parse().unwrap();
        assert_eq!(format_ip_bytes(&ip.octets()).as_deref(), Some("fe80::1"));
        assert_eq!(format_ip_bytes(&[1, 2, 3]), None);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn packet_address() {
        let mut bytes = vec![0u8; 20];
        bytes[11] = 6;
        bytes[12..18].copy_from_slice(&[0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]);
        let sa = RawSockaddr::new(AddressFamily::LINK, bytes);
        assert_eq!(format_sockaddr(&sa).as_deref(), Some("00:1a:2b:3c:4d:5e"));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn packet_address_without_hardware_address() {
        let sa = RawSockaddr::new(AddressFamily::LINK, vec![0u8; 20]);
        assert_eq!(format_sockaddr(&sa), None);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn packet_address_bounded_by_sockaddr() {
        // sll_addr holds 8 bytes, a larger sll_halen must not read past it
        let mut bytes = vec![0u8; 20];
        bytes[11] = 32;
        bytes[12..20].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let sa = RawSockaddr::new(AddressFamily::LINK, bytes);
        assert_eq!(
            format_sockaddr(&sa).as_deref(),
            Some("01:02:03:04:05:06:07:08")
        );
    }

    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "windows")))]
    #[test]
    fn link_address_follows_name() {
        let mut bytes = vec![0u8; 20];
        bytes[5] = 3;
        bytes[6] = 6;
        bytes[8..11].copy_from_slice(b"en0");
        bytes[11..17].copy_from_slice(&[0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]);
        let sa = RawSockaddr::new(AddressFamily::LINK, bytes);
        assert_eq!(format_sockaddr(&sa).as_deref(), Some("00:1a:2b:3c:4d:5e"));
    }
}
