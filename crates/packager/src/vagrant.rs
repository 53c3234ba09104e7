//! Box registration with Vagrant.

use crate::archive::box_file_name;
use crate::executor::{run_checked, CommandSpec, Executor, OutputMode};
use crate::naming::sanitize_box_name;
use std::path::{Path, PathBuf};
use tracing::info;
use vmbox_box_schema::{BOX_EXTENSION, VMWARE_DESKTOP_PROVIDER};
use vmbox_common::{Error, Result};

/// Where to get Vagrant when it is not installed.
pub const VAGRANT_HINT: &str = "install Vagrant from https://developer.hashicorp.com/vagrant/install";

fn is_box_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(BOX_EXTENSION))
}

/// Pick the box to register: the named one, or the only `.box` in `dir`.
///
/// An explicit name is either an existing file in `dir` or the same name a
/// build was given, which is sanitized the way the build sanitized it.
pub fn resolve_box_file(dir: &Path, explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(name) = explicit {
        let path = dir.join(name);
        if path.is_file() {
            return Ok(path);
        }

        let path = dir.join(box_file_name(&sanitize_box_name(name)?));
        if !path.is_file() {
            return Err(Error::BoxNotFound {
                dir: dir.to_path_buf(),
            });
        }
        return Ok(path);
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_box_file(&path) {
            candidates.push(path);
        }
    }

    match candidates.len() {
        0 => Err(Error::BoxNotFound {
            dir: dir.to_path_buf(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => {
            let mut names: Vec<String> = candidates
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            names.sort();
            Err(Error::AmbiguousBox { candidates: names })
        }
    }
}

/// Name the box is registered under: its file name, lower-cased.
pub fn box_identity(box_path: &Path) -> String {
    box_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// The `vagrant` executable.
#[derive(Debug, Clone)]
pub struct Vagrant {
    path: PathBuf,
}

impl Vagrant {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn box_add_command(&self, box_path: &Path, identity: &str) -> CommandSpec {
        CommandSpec::new(&self.path)
            .args(["box", "add", "--force", "--provider", VMWARE_DESKTOP_PROVIDER])
            .args(["--name", identity])
            .arg(box_path)
    }

    pub fn init_command(&self, identity: &str) -> CommandSpec {
        CommandSpec::new(&self.path).args(["init", "--force", identity])
    }

    /// Add the box to the local catalog, replacing any box with the same name.
    pub async fn add_box(
        &self,
        executor: &dyn Executor,
        box_path: &Path,
        identity: &str,
        dir: &Path,
    ) -> Result<()> {
        info!("Adding {} to Vagrant as {}", box_path.display(), identity);
        let cmd = self.box_add_command(box_path, identity).current_dir(dir);
        run_checked(executor, &cmd, OutputMode::Stream).await?;
        Ok(())
    }

    /// Write a Vagrantfile for the box into `dir`, replacing any existing one.
    pub async fn init(&self, executor: &dyn Executor, identity: &str, dir: &Path) -> Result<()> {
        info!("Initializing Vagrantfile for {}", identity);
        let cmd = self.init_command(identity).current_dir(dir);
        run_checked(executor, &cmd, OutputMode::Stream).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_single_box_selected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("My_VM.box"), "").unwrap();
        std::fs::write(dir.path().join("My_VM.box.sha256"), "").unwrap();
        std::fs::write(dir.path().join("a.vmx"), "").unwrap();

        let path = resolve_box_file(dir.path(), None).unwrap();
        assert_eq!(path, dir.path().join("My_VM.box"));
        assert_eq!(box_identity(&path), "my_vm.box");
    }

    #[test]
    fn test_no_box_is_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.vmx"), "").unwrap();
        assert!(matches!(
            resolve_box_file(dir.path(), None),
            Err(Error::BoxNotFound { .. })
        ));
    }

    #[test]
    fn test_multiple_boxes_are_ambiguous() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.box"), "").unwrap();
        std::fs::write(dir.path().join("a.box"), "").unwrap();

        match resolve_box_file(dir.path(), None) {
            Err(Error::AmbiguousBox { candidates }) => {
                assert_eq!(candidates, vec!["a.box", "b.box"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_box() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.box"), "").unwrap();
        std::fs::write(dir.path().join("b.box"), "").unwrap();

        assert_eq!(
            resolve_box_file(dir.path(), Some("b.box")).unwrap(),
            dir.path().join("b.box")
        );
        assert_eq!(
            resolve_box_file(dir.path(), Some("a")).unwrap(),
            dir.path().join("a.box")
        );
        assert!(matches!(
            resolve_box_file(dir.path(), Some("c.box")),
            Err(Error::BoxNotFound { .. })
        ));
    }

    #[test]
    fn test_explicit_name_matches_build_name() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("My_VM.box"), "").unwrap();
        std::fs::write(dir.path().join("ubuntu-22.04.box"), "").unwrap();

        assert_eq!(
            resolve_box_file(dir.path(), Some("My VM")).unwrap(),
            dir.path().join("My_VM.box")
        );
        assert_eq!(
            resolve_box_file(dir.path(), Some("ubuntu-22.04")).unwrap(),
            dir.path().join("ubuntu-22.04.box")
        );
        assert_eq!(
            resolve_box_file(dir.path(), Some("\"My VM.box\"")).unwrap(),
            dir.path().join("My_VM.box")
        );
        assert!(matches!(
            resolve_box_file(dir.path(), Some("\"\"")),
            Err(Error::EmptyBoxName)
        ));
    }

    #[test]
    fn test_commands() {
        let vagrant = Vagrant::new("vagrant");
        let add = vagrant.box_add_command(Path::new("/vms/My_VM.box"), "my_vm.box");
        assert_eq!(
            add.args_lossy(),
            vec![
                "box",
                "add",
                "--force",
                "--provider",
                "vmware_desktop",
                "--name",
                "my_vm.box",
                "/vms/My_VM.box"
            ]
        );

        let init = vagrant.init_command("my_vm.box");
        assert_eq!(init.display(), "vagrant init --force my_vm.box");
    }
}
