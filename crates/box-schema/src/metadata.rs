//! The `metadata.json` document shipped inside every box.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use vmbox_common::Result;

/// File name Vagrant expects for box metadata.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Vagrant provider identity for VMware desktop products.
pub const VMWARE_DESKTOP_PROVIDER: &str = "vmware_desktop";

/// Box metadata as read by `vagrant box add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxMetadata {
    pub provider: String,
    /// Keys written by other tools are carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for BoxMetadata {
    fn default() -> Self {
        Self {
            provider: VMWARE_DESKTOP_PROVIDER.to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Problem found in an existing metadata file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataIssue {
    #[error("metadata.json is not valid box metadata: {0}")]
    Unreadable(String),

    #[error("metadata.json declares provider '{found}', expected '{expected}'")]
    ProviderMismatch { found: String, expected: String },
}

impl BoxMetadata {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Write the default metadata into `dir`.
    pub fn write_default(dir: &Path) -> Result<()> {
        let json = Self::default().to_json_pretty()?;
        std::fs::write(dir.join(METADATA_FILE_NAME), json)?;
        Ok(())
    }

    /// Check an existing metadata file without modifying it.
    pub fn inspect(path: &Path) -> Result<Option<MetadataIssue>> {
        let data = std::fs::read(path)?;
        let metadata = match Self::from_slice(&data) {
            Ok(metadata) => metadata,
            Err(e) => return Ok(Some(MetadataIssue::Unreadable(e.to_string()))),
        };

        if metadata.provider != VMWARE_DESKTOP_PROVIDER {
            return Ok(Some(MetadataIssue::ProviderMismatch {
                found: metadata.provider,
                expected: VMWARE_DESKTOP_PROVIDER.to_string(),
            }));
        }

        Ok(None)
    }
}
