use serde::Serialize;
use std::fmt;

/// Platform address family number, as used for keys of address and gateway tables.
///
/// The numeric values follow the host operating system (`AF_INET6` is 10 on Linux,
/// 30 on macOS and 23 on Windows). `LINK` is the family under which hardware addresses
/// are reported: `AF_PACKET` on Linux, `AF_LINK` on the BSDs and a synthetic `-1000`
/// on Windows, which has no such family.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct AddressFamily(i32);

cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        use windows::Win32::Networking::WinSock;

        const UNSPEC: i32 = WinSock::AF_UNSPEC.0 as i32;
        const INET: i32 = WinSock::AF_INET.0 as i32;
        const INET6: i32 = WinSock::AF_INET6.0 as i32;
        const LINK: i32 = -1000;
        const LINK_NAME: &str = "AF_LINK";
    } else if #[cfg(any(target_os = "linux", target_os = "android"))] {
        const UNSPEC: i32 = libc::AF_UNSPEC;
        const INET: i32 = libc::AF_INET;
        const INET6: i32 = libc::AF_INET6;
        const LINK: i32 = libc::AF_PACKET;
        const LINK_NAME: &str = "AF_PACKET";
    } else {
        const UNSPEC: i32 = libc::AF_UNSPEC;
        const INET: i32 = libc::AF_INET;
        const INET6: i32 = libc::AF_INET6;
        const LINK: i32 = libc::AF_LINK;
        const LINK_NAME: &str = "AF_LINK";
    }
}

impl AddressFamily {
    pub const UNSPEC: Self = Self(UNSPEC);
    pub const INET: Self = Self(INET);
    pub const INET6: Self = Self(INET6);
    pub const LINK: Self = Self(LINK);

    pub const fn from_raw(family: i32) -> Self {
        Self(family)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Symbolic name for the families this crate knows about.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::UNSPEC => Some("AF_UNSPEC"),
            Self::INET => Some("AF_INET"),
            Self::INET6 => Some("AF_INET6"),
            Self::LINK => Some(LINK_NAME),
            _ => None,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<AddressFamily> for i32 {
    fn from(family: AddressFamily) -> Self {
        family.0
    }
}

#[cfg(test)]
mod test {
    use super::AddressFamily;

    #[test]
    fn known_families_are_distinct() {
        let families = [
            AddressFamily::UNSPEC,
            AddressFamily::INET,
            AddressFamily::INET6,
            AddressFamily::LINK,
        ];
        for (i, a) in families.iter().enumerate() {
            for b in &families[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn display() {
        assert_eq!(AddressFamily::INET.to_string(), "AF_INET");
        assert_eq!(AddressFamily::INET6.to_string(), "AF_INET6");
        assert_eq!(AddressFamily::from_raw(4242).to_string(), "4242");
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&AddressFamily::INET).unwrap();
        assert_eq!(json, AddressFamily::INET.raw().to_string());
    }
}
