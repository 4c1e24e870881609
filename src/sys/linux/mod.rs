mod route;

pub(crate) use route::NetlinkSource;
