use crate::record::{DefaultGateway, GatewayRecord, GatewayTable};
use crate::{AddressFamily, FamilyTable};
use log::trace;
use std::collections::HashMap;

/// A gateway route found by a platform backend, before defaults are chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GatewayCandidate {
    pub(crate) family: AddressFamily,
    pub(crate) gateway: String,
    pub(crate) interface: String,
    pub(crate) metric: Option<u32>,
    pub(crate) table: Option<u32>,
    /// Whether the route may be a default route at all (main routing table, not
    /// interface-scoped).
    pub(crate) eligible: bool,
}

impl GatewayCandidate {
    /// Lower is better. A route with a metric beats one without.
    fn rank(&self) -> (bool, u32) {
        match self.metric {
            Some(metric) => (false, metric),
            None => (true, 0),
        }
    }
}

/// Turns candidates into a gateway table, marking the best eligible candidates of each
/// family as default.
///
/// Every candidate sharing the best rank keeps `is_default`; the first of them in
/// discovery order becomes the family's default gateway.
pub(crate) fn select_defaults(candidates: Vec<GatewayCandidate>) -> GatewayTable {
    let mut best: HashMap<AddressFamily, (bool, u32)> = HashMap::new();
    for candidate in candidates.iter().filter(|c| c.eligible) {
        let rank = candidate.rank();
        best.entry(candidate.family)
            .and_modify(|current| *current = (*current).min(rank))
            .or_insert(rank);
    }

    let mut routes = FamilyTable::new();
    let mut defaults: Vec<(AddressFamily, DefaultGateway)> = vec![];
    for candidate in candidates {
        let is_default =
            candidate.eligible && best.get(&candidate.family) == Some(&candidate.rank());

        if is_default && !defaults.iter().any(|(f, _)| *f == candidate.family) {
            trace!(
                "default gateway for {}: {} via {}",
                candidate.family,
                candidate.gateway,
                candidate.interface
            );
            defaults.push((
                candidate.family,
                DefaultGateway {
                    gateway: candidate.gateway.clone(),
                    interface: candidate.interface.clone(),
                },
            ));
        }

        routes.push(
            candidate.family,
            GatewayRecord {
                gateway: candidate.gateway,
                interface: candidate.interface,
                is_default,
                metric: candidate.metric,
                table: candidate.table,
            },
        );
    }

    GatewayTable::new(routes, defaults)
}

#[cfg(test)]
mod test {
    use super::*;

    fn candidate(gateway: &str, interface: &str, metric: Option<u32>) -> GatewayCandidate {
        GatewayCandidate {
            family: AddressFamily::INET,
            gateway: gateway.to_string(),
            interface: interface.to_string(),
            metric,
            table: None,
            eligible: true,
        }
    }

    fn defaults_of(table: &GatewayTable) -> Vec<bool> {
        table
            .get(AddressFamily::INET)
            .unwrap()
            .iter()
            .map(|r| r.is_default)
            .collect()
    }

    #[test]
    fn single_gateway_is_default() {
        let table = select_defaults(vec![candidate("192.168.1.1", "eth0", None)]);
        let default = table.default_gateway(AddressFamily::INET).unwrap();
        assert_eq!(default.gateway, "192.168.1.1");
        assert_eq!(default.interface, "eth0");
        assert_eq!(defaults_of(&table), vec![true]);
    }

    #[test]
    fn lowest_metric_wins() {
        let table = select_defaults(vec![
            candidate("192.168.1.1", "eth0", Some(100)),
            candidate("10.0.0.1", "wlan0", Some(600)),
            candidate("172.16.0.1", "eth1", Some(50)),
        ]);
        assert_eq!(defaults_of(&table), vec![false, false, true]);
        let default = table.default_gateway(AddressFamily::INET).unwrap();
        assert_eq!(default.gateway, "172.16.0.1");
    }

    #[test]
    fn metric_beats_no_metric() {
        let table = select_defaults(vec![
            candidate("192.168.1.1", "eth0", None),
            candidate("10.0.0.1", "wlan0", Some(4000)),
        ]);
        assert_eq!(defaults_of(&table), vec![false, true]);
    }

    #[test]
    fn ties_are_all_default() {
        let table = select_defaults(vec![
            candidate("192.168.1.1", "eth0", None),
            candidate("10.0.0.1", "wlan0", None),
        ]);
        assert_eq!(defaults_of(&table), vec![true, true]);
        let default = table.default_gateway(AddressFamily::INET).unwrap();
        assert_eq!(default.gateway, "192.168.1.1");
    }

    #[test]
    fn ineligible_routes_are_never_default() {
        let mut scoped = candidate("10.0.0.1", "utun0", Some(0));
        scoped.eligible = false;
        let table = select_defaults(vec![scoped, candidate("192.168.1.1", "en0", Some(10))]);
        assert_eq!(defaults_of(&table), vec![false, true]);
        assert_eq!(
            table.default_gateway(AddressFamily::INET).unwrap().gateway,
            "192.168.1.1"
        );
    }

    #[test]
    fn family_without_eligible_routes_has_no_default() {
        let mut other_table = candidate("192.168.1.1", "eth0", Some(0));
        other_table.eligible = false;
        other_table.table = Some(100);
        let table = select_defaults(vec![other_table]);
        assert_eq!(defaults_of(&table), vec![false]);
        assert!(table.default_gateway(AddressFamily::INET).is_none());
        assert_eq!(table.get(AddressFamily::INET).unwrap()[0].table, Some(100));
    }

    #[test]
    fn families_are_independent() {
        let mut v6 = candidate("fe80::1", "eth0", Some(1024));
        v6.family = AddressFamily::INET6;
        let table = select_defaults(vec![candidate("192.168.1.1", "eth0", Some(100)), v6]);
        assert!(table.default_gateway(AddressFamily::INET).is_some());
        assert_eq!(
            table.default_gateway(AddressFamily::INET6).unwrap().gateway,
            "fe80::1"
        );
    }

    #[test]
    fn no_candidates() {
        let table = select_defaults(vec![]);
        assert!(table.routes().is_empty());
        assert_eq!(table.defaults().count(), 0);
    }
}
