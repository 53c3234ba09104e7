//! Kinds of files that make up a VMware box.

use crate::metadata::METADATA_FILE_NAME;
use std::fmt;
use std::path::Path;

/// A file kind on the box allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// `.nvram` - BIOS/EFI state.
    DiskState,
    /// `.vmsd` - snapshot metadata.
    SnapshotMetadata,
    /// `.vmx` - primary machine configuration.
    MachineConfig,
    /// `.vmxf` - extended team configuration.
    ExtendedConfig,
    /// `.vmdk` - virtual disk.
    DiskImage,
    /// `metadata.json` - Vagrant provider metadata.
    PackageMetadata,
}

impl FileKind {
    pub const ALL: [FileKind; 6] = [
        FileKind::DiskState,
        FileKind::SnapshotMetadata,
        FileKind::MachineConfig,
        FileKind::ExtendedConfig,
        FileKind::DiskImage,
        FileKind::PackageMetadata,
    ];

    /// Extension (without dot) identifying this kind, if matched by extension.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            FileKind::DiskState => Some("nvram"),
            FileKind::SnapshotMetadata => Some("vmsd"),
            FileKind::MachineConfig => Some("vmx"),
            FileKind::ExtendedConfig => Some("vmxf"),
            FileKind::DiskImage => Some("vmdk"),
            FileKind::PackageMetadata => None,
        }
    }

    /// Classify a path by its file name. Matching is case-sensitive.
    pub fn classify(path: &Path) -> Option<FileKind> {
        if path.file_name().and_then(|n| n.to_str()) == Some(METADATA_FILE_NAME) {
            return Some(FileKind::PackageMetadata);
        }

        let ext = path.extension()?.to_str()?;
        FileKind::ALL
            .into_iter()
            .find(|kind| kind.extension() == Some(ext))
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::DiskState => "disk-state",
            FileKind::SnapshotMetadata => "snapshot-metadata",
            FileKind::MachineConfig => "machine-config",
            FileKind::ExtendedConfig => "extended-config",
            FileKind::DiskImage => "disk-image",
            FileKind::PackageMetadata => "package-metadata",
        };
        f.write_str(name)
    }
}
