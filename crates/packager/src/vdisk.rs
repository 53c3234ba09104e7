//! Disk optimization through VMware's `vmware-vdiskmanager`.

use crate::discovery::ManagedFileSet;
use crate::executor::{run_checked, CommandSpec, Executor, OutputMode};
use crate::tools::locate_tool;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vmbox_common::{Error, HostPlatform, Result};
use walkdir::WalkDir;

/// Where to get the disk manager when it is not installed.
pub const VDISKMANAGER_HINT: &str =
    "you may download vmware-vdiskmanager from https://kb.vmware.com/s/article/1023856";

/// How deep to look below a VMware install root.
const SEARCH_DEPTH: usize = 4;

/// Which optimization passes to run on each disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeOptions {
    pub skip_defrag: bool,
    pub skip_shrink: bool,
}

impl OptimizeOptions {
    pub fn is_noop(&self) -> bool {
        self.skip_defrag && self.skip_shrink
    }
}

/// A located `vmware-vdiskmanager` executable.
#[derive(Debug, Clone)]
pub struct VdiskManager {
    path: PathBuf,
}

impl VdiskManager {
    #[cfg(test)]
    fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locate the disk manager: configured path, then `PATH`, then the
    /// platform's VMware install directories.
    pub fn locate(configured: Option<&Path>, platform: HostPlatform) -> Result<Self> {
        Self::locate_in(configured, platform, &platform.vmware_install_roots())
    }

    fn locate_in(
        configured: Option<&Path>,
        platform: HostPlatform,
        roots: &[PathBuf],
    ) -> Result<Self> {
        debug!(
            "Attempting to locate vdiskmanager and its support libraries on {}...",
            platform
        );
        let exe_name = platform.vdiskmanager_file_name();

        let path = match locate_tool(exe_name, configured, VDISKMANAGER_HINT) {
            Ok(path) => path,
            Err(e) if configured.is_none() => {
                find_in_roots(roots, exe_name, platform.is_windows()).ok_or(e)?
            }
            Err(e) => return Err(e),
        };

        ensure_support_libraries(&path, platform, roots)?;
        info!("Using vdiskmanager at {}", path.display());
        Ok(Self { path })
    }

    pub fn defragment_command(&self, disk: &Path) -> CommandSpec {
        CommandSpec::new(&self.path).arg("-d").arg(disk)
    }

    pub fn shrink_command(&self, disk: &Path) -> CommandSpec {
        CommandSpec::new(&self.path).arg("-k").arg(disk)
    }
}

fn name_matches(candidate: &OsStr, wanted: &str, ignore_case: bool) -> bool {
    let candidate = candidate.to_string_lossy();
    if ignore_case {
        candidate.eq_ignore_ascii_case(wanted)
    } else {
        candidate == wanted
    }
}

/// Search install roots for a file by name.
fn find_in_roots(roots: &[PathBuf], name: &str, ignore_case: bool) -> Option<PathBuf> {
    roots
        .iter()
        .filter(|root| root.is_dir())
        .find_map(|root| {
            WalkDir::new(root)
                .max_depth(SEARCH_DEPTH)
                .into_iter()
                .filter_map(|e| e.ok())
                .find(|e| e.file_type().is_file() && name_matches(e.file_name(), name, ignore_case))
                .map(|e| e.into_path())
        })
}

/// Make sure the platform's support libraries sit next to the executable,
/// copying them from elsewhere in the install roots when needed.
fn ensure_support_libraries(exe: &Path, platform: HostPlatform, roots: &[PathBuf]) -> Result<()> {
    let exe_dir = exe.parent().unwrap_or_else(|| Path::new("."));

    for lib in platform.vdiskmanager_support_libraries() {
        let target = exe_dir.join(lib);
        if target.exists() {
            debug!("Found {}", target.display());
            continue;
        }

        let source = find_in_roots(roots, lib, platform.is_windows()).ok_or_else(|| {
            Error::ToolNotFound {
                tool: lib.to_string(),
                hint: VDISKMANAGER_HINT.to_string(),
            }
        })?;

        info!("Copying {} to {}", source.display(), target.display());
        std::fs::copy(&source, &target)?;
    }

    Ok(())
}

/// Defragment then shrink every disk image, stopping at the first failure.
///
/// Returns the number of passes run.
pub async fn optimize_disks(
    executor: &dyn Executor,
    vdisk: &VdiskManager,
    files: &ManagedFileSet,
    options: OptimizeOptions,
) -> Result<usize> {
    let mut passes = 0;

    for disk in files.disk_images() {
        if options.skip_defrag {
            debug!("Skipping defragmentation of {}", disk.file_name());
        } else {
            info!("Defragmenting VMDK {:?}", disk.path);
            let cmd = vdisk.defragment_command(&disk.path).current_dir(files.dir());
            run_checked(executor, &cmd, OutputMode::Stream).await?;
            passes += 1;
        }

        if options.skip_shrink {
            debug!("Skipping shrink of {}", disk.file_name());
        } else {
            info!("Shrinking VMDK {:?}", disk.path);
            let cmd = vdisk.shrink_command(&disk.path).current_dir(files.dir());
            run_checked(executor, &cmd, OutputMode::Stream).await?;
            passes += 1;
        }
    }

    Ok(passes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::RecordingExecutor;
    use tempfile::tempdir;

    fn disk_set(dir: &Path) -> ManagedFileSet {
        ManagedFileSet::from_paths(
            dir,
            vec![
                dir.join("a.vmx"),
                dir.join("a.vmdk"),
                dir.join("a-s001.vmdk"),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_defrag_then_shrink_per_disk() {
        let dir = tempdir().unwrap();
        let executor = RecordingExecutor::new();
        let vdisk = VdiskManager::new("/opt/vmware/vmware-vdiskmanager");

        let passes = optimize_disks(&executor, &vdisk, &disk_set(dir.path()), OptimizeOptions::default())
            .await
            .unwrap();
        assert_eq!(passes, 4);

        let calls = executor.calls();
        let flags: Vec<(String, String)> = calls
            .iter()
            .map(|(c, _)| {
                let args = c.args_lossy();
                let disk = Path::new(&args[1]).file_name().unwrap().to_string_lossy().into_owned();
                (args[0].clone(), disk)
            })
            .collect();
        assert_eq!(
            flags,
            vec![
                ("-d".to_string(), "a.vmdk".to_string()),
                ("-k".to_string(), "a.vmdk".to_string()),
                ("-d".to_string(), "a-s001.vmdk".to_string()),
                ("-k".to_string(), "a-s001.vmdk".to_string()),
            ]
        );
        assert!(calls.iter().all(|(_, mode)| *mode == OutputMode::Stream));
    }

    #[tokio::test]
    async fn test_skip_flags() {
        let dir = tempdir().unwrap();
        let executor = RecordingExecutor::new();
        let vdisk = VdiskManager::new("vmware-vdiskmanager");
        let options = OptimizeOptions {
            skip_defrag: true,
            skip_shrink: false,
        };

        optimize_disks(&executor, &vdisk, &disk_set(dir.path()), options)
            .await
            .unwrap();
        assert!(executor
            .commands()
            .iter()
            .all(|c| c.args_lossy()[0] == "-k"));
        assert_eq!(executor.commands().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_passes() {
        let dir = tempdir().unwrap();
        let executor = RecordingExecutor::failing_on(" -k ");
        let vdisk = VdiskManager::new("vmware-vdiskmanager");

        let err = optimize_disks(&executor, &vdisk, &disk_set(dir.path()), OptimizeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(executor.commands().len(), 2);
    }

    #[test]
    fn test_locate_configured_linux() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("vmware-vdiskmanager");
        std::fs::write(&exe, "").unwrap();

        let vdisk = VdiskManager::locate_in(Some(&exe), HostPlatform::Linux, &[]).unwrap();
        assert_eq!(vdisk.path(), exe);
    }

    #[test]
    fn test_locate_in_roots_copies_support_libraries() {
        let root = tempdir().unwrap();
        let workstation = root.path().join("VMware Workstation");
        let openssl = root.path().join("OpenSSL").join("bin");
        std::fs::create_dir_all(&workstation).unwrap();
        std::fs::create_dir_all(&openssl).unwrap();
        std::fs::write(workstation.join("vmware-vdiskmanager.exe"), "").unwrap();
        std::fs::write(openssl.join("libeay32.dll"), "lib").unwrap();
        std::fs::write(root.path().join("SSLEAY32.DLL"), "lib").unwrap();

        let roots = vec![root.path().to_path_buf()];
        let vdisk = VdiskManager::locate_in(None, HostPlatform::Windows, &roots).unwrap();

        assert_eq!(vdisk.path(), workstation.join("vmware-vdiskmanager.exe"));
        assert!(workstation.join("libeay32.dll").exists());
        assert!(workstation.join("ssleay32.dll").exists());
    }

    #[test]
    fn test_missing_support_library() {
        let root = tempdir().unwrap();
        std::fs::write(root.path().join("vmware-vdiskmanager.exe"), "").unwrap();
        std::fs::write(root.path().join("libeay32.dll"), "").unwrap();

        let roots = vec![root.path().to_path_buf()];
        let err = VdiskManager::locate_in(None, HostPlatform::Windows, &roots).unwrap_err();
        match err {
            Error::ToolNotFound { tool, hint } => {
                assert_eq!(tool, "ssleay32.dll");
                assert!(hint.contains("kb.vmware.com"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_executable() {
        let root = tempdir().unwrap();
        let roots = vec![root.path().join("does-not-exist")];
        let err = VdiskManager::locate_in(None, HostPlatform::MacOs, &roots).unwrap_err();
        assert!(err.to_string().contains("kb.vmware.com"));
    }
}
