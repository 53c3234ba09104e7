//! Box archive assembly.

use crate::discovery::ManagedFileSet;
use crate::executor::{CommandSpec, Executor, OutputMode};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{debug, info, warn};
use vmbox_box_schema::BOX_EXTENSION;
use vmbox_common::{hash, Error, Result};

/// How the `.box` archive is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveBackend {
    /// External `tar -cvzf`, run inside the source directory.
    TarCommand { tar: PathBuf },
    /// In-process tar + gzip.
    Native,
}

/// Outcome of assembling a box.
#[derive(Debug, Clone)]
pub struct AssembledBox {
    pub path: PathBuf,
    /// False only when a best-effort archiver run failed.
    pub complete: bool,
}

/// `<name>.box`
pub fn box_file_name(box_name: &str) -> String {
    format!("{box_name}.{BOX_EXTENSION}")
}

/// Assemble `<box_name>.box` in the source directory from the managed files.
///
/// With `best_effort`, a failing external archiver is reported as a warning
/// instead of an error.
pub async fn assemble_box(
    executor: &dyn Executor,
    files: &ManagedFileSet,
    box_name: &str,
    backend: &ArchiveBackend,
    best_effort: bool,
) -> Result<AssembledBox> {
    files.require_disk_image()?;

    let file_name = box_file_name(box_name);
    let box_path = files.dir().join(&file_name);
    info!("Compressing {} files into {}", files.len(), file_name);

    let complete = match backend {
        ArchiveBackend::TarCommand { tar } => {
            let cmd = CommandSpec::new(tar)
                .args(["-cvzf", file_name.as_str(), "--"])
                .args(files.file_names())
                .current_dir(files.dir());

            let output = executor.execute(&cmd, OutputMode::Capture).await?;
            for line in output.stdout.lines().chain(output.stderr.lines()) {
                info!("{}", line);
            }

            if output.success() {
                true
            } else if best_effort {
                warn!(
                    "Archiver exited with {:?}, continuing (best effort)",
                    output.exit_code
                );
                false
            } else {
                return Err(Error::CommandFailed {
                    cmd: cmd.display(),
                    code: output.exit_code,
                });
            }
        }
        ArchiveBackend::Native => {
            let sources: Vec<(PathBuf, String)> = files
                .files()
                .iter()
                .map(|f| (f.path.clone(), f.file_name()))
                .collect();
            let target = box_path.clone();

            tokio::task::spawn_blocking(move || write_native_box(&target, &sources))
                .await
                .map_err(|e| Error::Other(format!("archive task failed: {e}")))??;
            true
        }
    };

    Ok(AssembledBox {
        path: box_path,
        complete,
    })
}

/// Write a gzip-compressed tarball with entries named by file name only.
fn write_native_box(path: &Path, sources: &[(PathBuf, String)]) -> Result<()> {
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = Builder::new(encoder);

    for (source, name) in sources {
        debug!("Adding {}", name);
        archive.append_path_with_name(source, name)?;
    }

    archive.into_inner()?.finish()?;
    Ok(())
}

/// Write `<box>.sha256` in `sha256sum` format and return the digest.
pub fn write_checksum(box_path: &Path) -> Result<String> {
    let digest = hash::sha256_file(box_path)?;
    let name = box_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut sidecar = box_path.as_os_str().to_os_string();
    sidecar.push(".sha256");
    std::fs::write(&sidecar, format!("{digest}  {name}\n"))?;

    Ok(digest)
}
