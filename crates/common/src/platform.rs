//! Host platform definitions and VMware install layouts.

use std::fmt;
use std::path::PathBuf;

/// Platform the packager is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Linux,
    Windows,
    MacOs,
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPlatform::Linux => write!(f, "linux"),
            HostPlatform::Windows => write!(f, "windows"),
            HostPlatform::MacOs => write!(f, "macos"),
        }
    }
}

impl HostPlatform {
    /// Platform of the running binary.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            HostPlatform::Windows
        } else if cfg!(target_os = "macos") {
            HostPlatform::MacOs
        } else {
            HostPlatform::Linux
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, HostPlatform::Windows)
    }

    /// File name of the VMware disk manager executable.
    pub fn vdiskmanager_file_name(&self) -> &'static str {
        match self {
            HostPlatform::Windows => "vmware-vdiskmanager.exe",
            HostPlatform::Linux | HostPlatform::MacOs => "vmware-vdiskmanager",
        }
    }

    /// Directories VMware products install into on this platform.
    pub fn vmware_install_roots(&self) -> Vec<PathBuf> {
        match self {
            HostPlatform::Windows => vec![
                PathBuf::from(r"C:\Program Files (x86)\VMware"),
                PathBuf::from(r"C:\Program Files\VMware"),
            ],
            HostPlatform::Linux => vec![
                PathBuf::from("/usr/bin"),
                PathBuf::from("/usr/lib/vmware/bin"),
            ],
            HostPlatform::MacOs => vec![PathBuf::from(
                "/Applications/VMware Fusion.app/Contents/Library",
            )],
        }
    }

    /// Shared libraries the disk manager needs next to its executable.
    pub fn vdiskmanager_support_libraries(&self) -> &'static [&'static str] {
        match self {
            HostPlatform::Windows => &["libeay32.dll", "ssleay32.dll"],
            HostPlatform::Linux | HostPlatform::MacOs => &[],
        }
    }
}
