//! Locating the external executables the packager shells out to.

use std::path::{Path, PathBuf};
use tracing::debug;
use vmbox_common::{Error, Result};

/// Explicit executable paths that take precedence over `PATH` lookup.
#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
    pub vdiskmanager: Option<PathBuf>,
    pub tar: Option<PathBuf>,
}

/// Find `name`, checking the configured override first, then `PATH`.
pub fn locate_tool(name: &str, configured: Option<&Path>, hint: &str) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            debug!("Using configured {}: {}", name, path.display());
            return Ok(path.to_path_buf());
        }
        return Err(Error::ToolNotFound {
            tool: name.to_string(),
            hint: format!("configured path {} does not exist", path.display()),
        });
    }

    match which::which(name) {
        Ok(path) => {
            debug!("Found {} in PATH: {}", name, path.display());
            Ok(path)
        }
        Err(_) => Err(Error::ToolNotFound {
            tool: name.to_string(),
            hint: hint.to_string(),
        }),
    }
}
