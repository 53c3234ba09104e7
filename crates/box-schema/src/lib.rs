//! Box schema definitions for vmbox.
//!
//! This crate defines what goes into a Vagrant box built from a VMware
//! machine: the allow-listed file kinds and the `metadata.json` document.

pub mod kind;
pub mod metadata;

pub use kind::FileKind;
pub use metadata::{BoxMetadata, MetadataIssue, METADATA_FILE_NAME, VMWARE_DESKTOP_PROVIDER};

/// Extension of a produced box archive.
pub const BOX_EXTENSION: &str = "box";
