mod adapters;
mod forward;
mod mib_table;

pub(crate) use adapters::AdapterSource;
pub(crate) use forward::ForwardTableSource;

/// Windows renders IPv6 scopes as the bare interface index.
pub(crate) fn scope_name(scope_id: u32) -> String {
    scope_id.to_string()
}
