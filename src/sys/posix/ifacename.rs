use delegate::delegate;
use std::ffi::{CStr, CString};
use std::iter::zip;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum InterfaceNameError {
    #[error("interface name is > 16 (null-terminated): {0:?}")]
    NameTooLong(String),
    #[error("NUL byte encountered in name: {0:?}")]
    NulByteEncountered(String),
    #[error("no NUL byte encountered inside InterfaceName: {0:?}")]
    InvalidCString(Vec<libc::c_char>),
    #[error("invalid Unicode characters inside InterfaceName: {0:?}")]
    InvalidUnicodeString(Vec<libc::c_char>),
}

/// Fixed-size, NUL-terminated interface name as used by `ifreq` and `if_indextoname(3)`.
#[repr(transparent)]
#[derive(Copy, Clone, Debug)]
pub(crate) struct InterfaceName([libc::c_char; libc::IFNAMSIZ as _]);

impl Default for InterfaceName {
    fn default() -> Self {
        Self([0; libc::IFNAMSIZ as _])
    }
}

impl TryFrom<&str> for InterfaceName {
    type Error = InterfaceNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.len() >= libc::IFNAMSIZ {
            return Err(InterfaceNameError::NameTooLong(value.to_string()));
        }
        let cname = CString::new(value)
            .map_err(|_| InterfaceNameError::NulByteEncountered(value.to_string()))?;

        let mut result = Self::default();
        for (x, y) in zip(result.0.iter_mut(), cname.as_bytes_with_nul().iter()) {
            *x = *y as libc::c_char;
        }
        Ok(result)
    }
}

impl TryFrom<&InterfaceName> for String {
    type Error = InterfaceNameError;

    fn try_from(value: &InterfaceName) -> Result<Self, Self::Error> {
        if !value.is_terminated() {
            return Err(InterfaceNameError::InvalidCString(value.0.to_vec()));
        }
        Ok(unsafe { CStr::from_ptr(value.0.as_ptr()) }
            .to_str()
            .map_err(|_| InterfaceNameError::InvalidUnicodeString(value.0.to_vec()))?
            .to_string())
    }
}

impl InterfaceName {
    fn is_terminated(&self) -> bool {
        self.0.contains(&0)
    }

    delegate! {
        to self.0 {
            pub(crate) fn as_mut_ptr(&mut self) -> *mut libc::c_char;
        }
    }
}
