cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        mod win32;
        pub(crate) use win32::scope_name;
        pub(crate) use win32::AdapterSource as AddressSource;
        pub(crate) use win32::ForwardTableSource as GatewaySource;
    } else if #[cfg(unix)] {
        mod posix;
        pub(crate) use posix::scope_name;

        cfg_if::cfg_if! {
            if #[cfg(feature = "ioctl")] {
                pub(crate) use posix::ioctl::IoctlSource as AddressSource;
            } else {
                pub(crate) use posix::ifaddrs::IfAddrsSource as AddressSource;
            }
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        mod linux;
        pub(crate) use linux::NetlinkSource as GatewaySource;
    } else if #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly"
    ))] {
        mod bsd;

        cfg_if::cfg_if! {
            if #[cfg(feature = "pf-route")] {
                pub(crate) use bsd::pfroute::PfRouteSource as GatewaySource;
            } else {
                pub(crate) use bsd::sysctl::SysctlSource as GatewaySource;
            }
        }
    } else if #[cfg(not(target_os = "windows"))] {
        mod unsupported;
        pub(crate) use unsupported::UnsupportedSource as GatewaySource;
    }
}

#[cfg(any(
    test,
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
mod rtmsg;
