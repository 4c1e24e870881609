use super::sockaddr::{format_sockaddr, RawSockaddr};
use crate::prefix::prefix_len;
use crate::AddressFamily;
use std::fmt::Write;

/// Renders a netmask sockaddr. IPv6 masks use CIDR notation, everything else is formatted
/// like an address.
pub(crate) fn format_netmask(sa: &RawSockaddr) -> Option<String> {
    if sa.family() != AddressFamily::INET6 {
        return format_sockaddr(sa);
    }
    let canonical = sa.canonical();
    let mask: [u8; 16] = canonical[8..24].try_into().ok()?;
    Some(format_cidr(&mask))
}

/// `ffff:ffff:ffff:ffff::/64` style rendering of an IPv6 netmask.
///
/// Bytes are printed as two lowercase hex digits each, grouped in pairs, up to the last
/// group touched by the prefix. No zero compression beyond the trailing `::` is attempted.
pub(crate) fn format_cidr(mask: &[u8; 16]) -> String {
    let prefix = prefix_len(mask);
    let bytes = 2 * ((prefix as usize + 15) / 16);

    let mut out = String::with_capacity(44);
    for (n, byte) in mask[..bytes].iter().enumerate() {
        if n > 0 && n % 2 == 0 {
            out.push(':');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    if bytes < 16 {
        out.push_str("::");
    }
    let _ = write!(out, "/{}", prefix);
    out
}
