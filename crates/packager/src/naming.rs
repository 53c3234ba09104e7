//! Box name resolution.
//!
//! A box is named either explicitly by the user or after the `displayName`
//! entry of the machine's `.vmx` file.

use crate::discovery::scan;
use std::path::Path;
use tracing::{debug, info};
use vmbox_box_schema::{FileKind, BOX_EXTENSION};
use vmbox_common::{Error, Result};

const DISPLAY_NAME_KEY: &str = "displayName";

/// Turn a raw name into a filesystem-safe box name.
pub fn sanitize_box_name(raw: &str) -> Result<String> {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '"' | '\'')).collect();
    let trimmed = stripped.trim();

    let suffix = format!(".{BOX_EXTENSION}");
    let base = match trimmed.len().checked_sub(suffix.len()) {
        Some(at) if trimmed.is_char_boundary(at)
            && trimmed[at..].eq_ignore_ascii_case(&suffix) =>
        {
            &trimmed[..at]
        }
        _ => trimmed,
    };

    let name: String = base
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();

    if name.is_empty() {
        return Err(Error::EmptyBoxName);
    }
    Ok(name)
}

/// Raw value of the first `displayName` line; the key is matched case-insensitively.
pub fn parse_display_name(vmx: &str) -> Option<&str> {
    vmx.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(DISPLAY_NAME_KEY)
            .then_some(value)
    })
}

/// Derive the box name from the first `.vmx` file in `dir`.
pub fn box_name_from_vmx(dir: &Path) -> Result<String> {
    let vmx = scan(dir)?
        .into_iter()
        .find(|f| f.kind == FileKind::MachineConfig)
        .ok_or_else(|| Error::MissingMachineConfig {
            dir: dir.to_path_buf(),
        })?;
    debug!("Found VMX file: {}", vmx.path.display());

    let bytes = std::fs::read(&vmx.path)?;
    let contents = String::from_utf8_lossy(&bytes);

    let raw = parse_display_name(&contents).ok_or_else(|| Error::DisplayNameNotFound {
        path: vmx.path.clone(),
    })?;
    sanitize_box_name(raw)
}

/// Use the explicit name when given, otherwise read it from the `.vmx`.
pub fn resolve_box_name(dir: &Path, explicit: Option<&str>) -> Result<String> {
    let name = match explicit {
        Some(raw) => sanitize_box_name(raw)?,
        None => {
            info!("Box name not set, choosing box name from VMX file");
            box_name_from_vmx(dir)?
        }
    };
    info!("A box name of '{}' will be used", name);
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_display_name_with_spaces() {
        let vmx = ".encoding = \"UTF-8\"\nconfig.version = \"8\"\ndisplayName = \"My VM\"\n";
        let raw = parse_display_name(vmx).unwrap();
        assert_eq!(sanitize_box_name(raw).unwrap(), "My_VM");
    }

    #[test]
    fn test_display_name_key_case_insensitive() {
        assert_eq!(parse_display_name("displayname = \"a\""), Some(" \"a\""));
        assert_eq!(parse_display_name("DISPLAYNAME=\"b\""), Some("\"b\""));
        assert_eq!(parse_display_name("  DisplayName = c"), Some(" c"));
    }

    #[test]
    fn test_first_display_name_wins() {
        let vmx = "displayName = \"first\"\ndisplayName = \"second\"\n";
        assert_eq!(sanitize_box_name(parse_display_name(vmx).unwrap()).unwrap(), "first");
    }

    #[test]
    fn test_similar_keys_ignored() {
        let vmx = "displayName.old = \"x\"\nguestinfo.displayName = \"y\"\n";
        assert_eq!(parse_display_name(vmx), None);
    }

    #[test]
    fn test_value_keeps_later_equals() {
        let vmx = "displayName = \"a=b c\"";
        assert_eq!(sanitize_box_name(parse_display_name(vmx).unwrap()).unwrap(), "a=b_c");
    }

    #[test]
    fn test_sanitize_explicit_names() {
        assert_eq!(sanitize_box_name("Windows 10").unwrap(), "Windows_10");
        assert_eq!(sanitize_box_name("Windows 10.box").unwrap(), "Windows_10");
        assert_eq!(sanitize_box_name("kali.BOX").unwrap(), "kali");
        assert_eq!(sanitize_box_name("'quoted'").unwrap(), "quoted");
        assert_eq!(sanitize_box_name("ubuntu-22.04").unwrap(), "ubuntu-22.04");
        assert_eq!(sanitize_box_name("a/b").unwrap(), "a_b");
    }

    #[test]
    fn test_sanitize_empty() {
        assert!(matches!(sanitize_box_name("\"\""), Err(Error::EmptyBoxName)));
        assert!(matches!(sanitize_box_name("  .box"), Err(Error::EmptyBoxName)));
    }

    #[test]
    fn test_box_name_from_vmx() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("win.vmx"),
            "virtualHW.version = \"19\"\r\ndisplayName = \"Windows 10 x64\"\r\n",
        )
        .unwrap();

        assert_eq!(box_name_from_vmx(dir.path()).unwrap(), "Windows_10_x64");
    }

    #[test]
    fn test_missing_display_name() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("win.vmx"), "memsize = \"4096\"\n").unwrap();

        let err = box_name_from_vmx(dir.path()).unwrap_err();
        assert!(matches!(err, Error::DisplayNameNotFound { .. }));
        assert!(err.to_string().contains("--box_name"));
    }

    #[test]
    fn test_missing_vmx() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("disk.vmdk"), "x").unwrap();

        assert!(matches!(
            box_name_from_vmx(dir.path()),
            Err(Error::MissingMachineConfig { .. })
        ));
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("win.vmx"), "displayName = \"from vmx\"\n").unwrap();

        assert_eq!(resolve_box_name(dir.path(), Some("given name")).unwrap(), "given_name");
        assert_eq!(resolve_box_name(dir.path(), None).unwrap(), "from_vmx");
    }
}
