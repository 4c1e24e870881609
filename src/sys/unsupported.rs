use crate::traits::GatewaySourceT;
use crate::{Error, GatewayTable};

pub(crate) struct UnsupportedSource;

impl GatewaySourceT for UnsupportedSource {
    fn gateways() -> Result<GatewayTable, Error> {
        Err(Error::UnsupportedPlatform)
    }
}
