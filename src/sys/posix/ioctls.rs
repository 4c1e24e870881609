cfg_if::cfg_if! {
    if #[cfg(all(feature = "ioctl", any(target_os = "linux", target_os = "android")))] {
        nix::ioctl_read_bad!(siocgifconf, libc::SIOCGIFCONF, super::ifreq::ifconf);
        nix::ioctl_read_bad!(siocgifflags, libc::SIOCGIFFLAGS, super::ifreq::ifreq);
        nix::ioctl_read_bad!(siocgifaddr, libc::SIOCGIFADDR, super::ifreq::ifreq);
        nix::ioctl_read_bad!(siocgifdstaddr, libc::SIOCGIFDSTADDR, super::ifreq::ifreq);
        nix::ioctl_read_bad!(siocgifbrdaddr, libc::SIOCGIFBRDADDR, super::ifreq::ifreq);
        nix::ioctl_read_bad!(siocgifnetmask, libc::SIOCGIFNETMASK, super::ifreq::ifreq);
        nix::ioctl_read_bad!(siocgifhwaddr, libc::SIOCGIFHWADDR, super::ifreq::ifreq);
    } else if #[cfg(feature = "ioctl")] {
        nix::ioctl_readwrite!(siocgifflags, b'i', 17, super::ifreq::ifreq);
        nix::ioctl_readwrite!(siocgifaddr, b'i', 33, super::ifreq::ifreq);
        nix::ioctl_readwrite!(siocgifdstaddr, b'i', 34, super::ifreq::ifreq);
        nix::ioctl_readwrite!(siocgifbrdaddr, b'i', 35, super::ifreq::ifreq);
        nix::ioctl_readwrite!(siocgifconf, b'i', 36, super::ifreq::ifconf);
        nix::ioctl_readwrite!(siocgifnetmask, b'i', 37, super::ifreq::ifreq);
    }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
nix::ioctl_readwrite!(siocgifaflag_in6, b'i', 73, super::ifreq::in6_ifreq);
