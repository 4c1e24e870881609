#[cfg(feature = "pf-route")]
pub(crate) mod pfroute;
#[cfg(not(feature = "pf-route"))]
pub(crate) mod sysctl;

use std::{mem, ptr};

pub(crate) const RT_MSGHDR_LEN: usize = mem::size_of::<libc::rt_msghdr>();

/// Copies the `rt_msghdr` at the start of `msg`.
pub(crate) fn rt_msghdr(msg: &[u8]) -> Option<libc::rt_msghdr> {
    if msg.len() < RT_MSGHDR_LEN {
        return None;
    }
    Some(unsafe { ptr::read_unaligned(msg.as_ptr() as *const libc::rt_msghdr) })
}

/// Whether a route may serve as default. Interface-scoped routes on macOS only apply to
/// traffic bound to that interface.
pub(crate) fn is_unscoped(_flags: libc::c_int) -> bool {
    cfg_if::cfg_if! {
        if #[cfg(target_vendor = "apple")] {
            _flags & libc::RTF_IFSCOPE == 0
        } else {
            true
        }
    }
}
