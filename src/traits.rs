use crate::{AddressTable, Error, GatewayTable};

/// Source of interface names and per-interface addresses.
pub(crate) trait AddressSourceT {
    fn interfaces() -> Result<Vec<String>, Error>;
    fn addresses(name: &str) -> Result<AddressTable, Error>;
}

/// Source of gateway routes.
pub(crate) trait GatewaySourceT {
    fn gateways() -> Result<GatewayTable, Error>;
}
