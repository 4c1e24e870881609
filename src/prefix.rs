use ipnet::{IpNet, Ipv6Net};
use std::net::{IpAddr, Ipv6Addr};

/// Number of leading bits of `mask` up to and including its last set bit.
///
/// Only trailing zeroes are counted, so non-contiguous masks are not rejected: the prefix of
/// `ff:00:ff:00` is 24.
pub(crate) fn prefix_len(mask: &[u8]) -> u32 {
    let mut zeroes = 0;
    for byte in mask.iter().rev() {
        if *byte != 0 {
            zeroes += byte.trailing_zeros();
            break;
        }
        zeroes += 8;
    }
    mask.len() as u32 * 8 - zeroes
}

/// IPv6 netmask bytes with the first `prefix` bits set.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn mask_from_prefix(prefix: u8) -> Option<[u8; 16]> {
    let net = Ipv6Net::new(Ipv6Addr::UNSPECIFIED, prefix).ok()?;
    Some(net.netmask().octets())
}

/// Picks the on-link prefix that best describes `address`.
///
/// Prefixes are taken in order. Once one has matched, later prefixes only replace it if they
/// are at least as long and shorter than host length, so a host-length prefix listed first
/// stays the best match.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn best_prefix<I>(address: IpAddr, prefixes: I) -> Option<IpNet>
where
    I: IntoIterator<Item = IpNet>,
{
    let mut best: Option<IpNet> = None;
    for prefix in prefixes {
        if prefix.addr().is_ipv4() != address.is_ipv4() {
            continue;
        }
        if let Some(current) = best {
            if prefix.prefix_len() < current.prefix_len()
                || prefix.prefix_len() == prefix.max_prefix_len()
            {
                continue;
            }
        }
        if prefix.contains(&address) {
            best = Some(prefix);
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn contiguous_masks() {
        assert_eq!(prefix_len(&[255, 255, 255, 0]), 24);
        assert_eq!(prefix_len(&[0; 4]), 0);
        assert_eq!(prefix_len(&[0xff; 16]), 128);
        assert_eq!(prefix_len(&[255, 255, 255, 0xc0]), 26);
    }

    #[test]
    fn non_contiguous_mask() {
        assert_eq!(prefix_len(&[0xff, 0x00, 0xff, 0x00]), 24);
    }

    #[test]
    fn mask_round_trip() {
        for prefix in 0..=128u8 {
            let mask = mask_from_prefix(prefix).unwrap();
            assert_eq!(prefix_len(&mask), prefix as u32);
        }
        assert_eq!(mask_from_prefix(129), None);
    }

    #[test]
    fn longest_match_wins() {
        let prefixes = vec![
            net("10.0.0.0/8"),
            net("10.1.0.0/16"),
            net("192.168.0.0/16"),
        ];
        let best = best_prefix("10.1.2.3".parse().unwrap(), prefixes);
        assert_eq!(best, Some(net("10.1.0.0/16")));
    }

    #[test]
    fn host_prefix_after_a_match_is_ignored() {
        let prefixes = vec![net("192.168.1.0/24"), net("192.168.1.10/32")];
        let best = best_prefix("192.168.1.10".parse().unwrap(), prefixes);
        assert_eq!(best, Some(net("192.168.1.0/24")));

        let prefixes = vec![net("192.168.1.10/32")];
        let best = best_prefix("192.168.1.10".parse().unwrap(), prefixes);
        assert_eq!(best, Some(net("192.168.1.10/32")));
    }

    #[test]
    fn first_host_prefix_is_kept() {
        // A shorter prefix never replaces an earlier match
        let prefixes = vec![net("192.168.1.10/32"), net("192.168.1.0/24")];
        let best = best_prefix("192.168.1.10".parse().unwrap(), prefixes);
        assert_eq!(best, Some(net("192.168.1.10/32")));
    }

    #[test]
    fn other_family_is_ignored() {
        let prefixes = vec![net("::/0"), net("fe80::/64")];
        assert_eq!(best_prefix("10.0.0.1".parse().unwrap(), prefixes), None);
    }

    #[test]
    fn broadcast_of_best_prefix() {
        let best = best_prefix("192.168.1.10".parse().unwrap(), vec![net("192.168.1.0/24")]);
        assert_eq!(best.unwrap().broadcast().to_string(), "192.168.1.255");
    }
}
