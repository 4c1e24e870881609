//! Point-in-time snapshot of the host's network interfaces, the addresses assigned to them
//! and the gateways known to the routing table.
//!
//! Every call queries the OS afresh; nothing is cached between calls.
mod error;
mod family;
mod format;
mod gateway;
mod names;
mod prefix;
mod record;
mod sys;
mod table;
mod traits;

pub use error::Error;
pub use family::AddressFamily;
pub use record::{AddressRecord, AddressTable, DefaultGateway, Destination, GatewayRecord, GatewayTable};
pub use table::FamilyTable;

use traits::{AddressSourceT, GatewaySourceT};

/// Names of all interfaces that have at least one address entry, in discovery order and
/// without duplicates.
pub fn list_interfaces() -> Result<Vec<String>, Error> {
    sys::AddressSource::interfaces()
}

/// Addresses of the interface called `name`, grouped by family.
///
/// On Windows `name` is the adapter name (a GUID string), as returned by
/// [`list_interfaces`].
///
/// Returns [`Error::NoSuchInterface`] if no address entry carries this name.
pub fn interface_addresses(name: &str) -> Result<AddressTable, Error> {
    sys::AddressSource::addresses(name)
}

/// Gateway routes per family and the default gateway of each family.
pub fn list_gateways() -> Result<GatewayTable, Error> {
    sys::GatewaySource::gateways()
}
