use crate::format::{format_netmask, format_sockaddr, RawSockaddr};
use crate::{AddressFamily, FamilyTable};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::net::Ipv4Addr;

/// Addresses of a single interface, grouped by family.
pub type AddressTable = FamilyTable<AddressRecord>;

/// The far side of an address: the broadcast address of its network, or the peer of a
/// point-to-point (or loopback) link. Never both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Broadcast(String),
    Peer(String),
}

/// One address assigned to an interface. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AddressRecord {
    #[serde(rename = "addr", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,
    #[serde(flatten)]
    pub destination: Option<Destination>,
    /// IPv6 address flags, where the platform exposes them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
}

impl AddressRecord {
    /// Builds a record from the sockaddrs the OS reported for one address entry.
    ///
    /// `destination` is taken as the peer address when `point_to_point` is set and as the
    /// broadcast address otherwise.
    pub(crate) fn from_sockaddrs(
        address: Option<&RawSockaddr>,
        netmask: Option<&RawSockaddr>,
        destination: Option<&RawSockaddr>,
        point_to_point: bool,
    ) -> Self {
        let destination = destination.and_then(format_sockaddr).map(|d| {
            if point_to_point {
                Destination::Peer(d)
            } else {
                Destination::Broadcast(d)
            }
        });

        let mut record = Self {
            address: address.and_then(format_sockaddr),
            netmask: netmask.and_then(format_netmask),
            destination,
            flags: None,
        };
        if let Some(ip) = address.and_then(RawSockaddr::ipv4) {
            record.drop_link_local_broadcast(ip);
        }
        record
    }

    pub fn broadcast(&self) -> Option<&str> {
        match &self.destination {
            Some(Destination::Broadcast(b)) => Some(b),
            _ => None,
        }
    }

    pub fn peer(&self) -> Option<&str> {
        match &self.destination {
            Some(Destination::Peer(p)) => Some(p),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.netmask.is_none()
            && self.destination.is_none()
            && self.flags.is_none()
    }

    /// 169.254.0.0/16 has no meaningful broadcast address.
    pub(crate) fn drop_link_local_broadcast(&mut self, address: Ipv4Addr) {
        if address.is_link_local() && self.broadcast().is_some() {
            self.destination = None;
        }
    }
}

impl AddressTable {
    /// Adds `record` unless it carries nothing at all.
    pub(crate) fn push_record(&mut self, family: AddressFamily, record: AddressRecord) {
        if !record.is_empty() {
            self.push(family, record);
        }
    }
}

/// A route towards a gateway, as found in the routing table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GatewayRecord {
    pub gateway: String,
    pub interface: String,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<u32>,
}

/// The gateway the system would use for a family, together with its interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefaultGateway {
    pub gateway: String,
    pub interface: String,
}

impl Serialize for DefaultGateway {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.gateway, &self.interface).serialize(serializer)
    }
}

/// All gateways per family plus the default gateway of each family that has one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GatewayTable {
    routes: FamilyTable<GatewayRecord>,
    defaults: Vec<(AddressFamily, DefaultGateway)>,
}

impl GatewayTable {
    pub(crate) fn new(
        routes: FamilyTable<GatewayRecord>,
        defaults: Vec<(AddressFamily, DefaultGateway)>,
    ) -> Self {
        Self { routes, defaults }
    }

    pub fn routes(&self) -> &FamilyTable<GatewayRecord> {
        &self.routes
    }

    pub fn get(&self, family: AddressFamily) -> Option<&[GatewayRecord]> {
        self.routes.get(family)
    }

    pub fn default_gateway(&self, family: AddressFamily) -> Option<&DefaultGateway> {
        self.defaults
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, gw)| gw)
    }

    pub fn defaults(&self) -> impl Iterator<Item = (AddressFamily, &DefaultGateway)> + '_ {
        self.defaults.iter().map(|(f, gw)| (*f, gw))
    }
}

impl Serialize for GatewayTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.routes.len() + 1))?;
        let defaults: Vec<_> = self.defaults.iter().map(|(f, gw)| (f.raw(), gw)).collect();
        map.serialize_entry("default", &DefaultsMap(&defaults))?;
        for (family, records) in self.routes.iter() {
            map.serialize_entry(&family.raw().to_string(), records)?;
        }
        map.end()
    }
}

struct DefaultsMap<'a>(&'a [(i32, &'a DefaultGateway)]);

impl Serialize for DefaultsMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (family, gw) in self.0 {
            map.serialize_entry(family, gw)?;
        }
        map.end()
    }
}
