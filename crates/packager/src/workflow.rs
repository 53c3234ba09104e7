//! Build and registration workflows.
//!
//! Both are strictly sequential and fail fast: the first error aborts the
//! run and nothing already done is rolled back.

use crate::archive::{assemble_box, write_checksum, ArchiveBackend};
use crate::discovery::discover;
use crate::executor::Executor;
use crate::naming::resolve_box_name;
use crate::tools::{locate_tool, ToolOverrides};
use crate::vagrant::{box_identity, resolve_box_file, Vagrant, VAGRANT_HINT};
use crate::vdisk::{optimize_disks, OptimizeOptions, VdiskManager};
use std::path::PathBuf;
use tracing::{info, warn};
use vmbox_common::{HostPlatform, Result};

/// Archiver selection for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiverChoice {
    #[default]
    Tar,
    Native,
}

/// Inputs to [`build_box`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub dir: PathBuf,
    pub box_name: Option<String>,
    pub optimize: OptimizeOptions,
    pub archiver: ArchiverChoice,
    pub best_effort_archive: bool,
    pub tools: ToolOverrides,
    pub platform: HostPlatform,
}

impl BuildOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            box_name: None,
            optimize: OptimizeOptions::default(),
            archiver: ArchiverChoice::default(),
            best_effort_archive: false,
            tools: ToolOverrides::default(),
            platform: HostPlatform::current(),
        }
    }
}

/// What a build produced.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub box_name: String,
    pub box_path: PathBuf,
    pub files: Vec<String>,
    pub optimization_passes: usize,
    /// False when a best-effort archive run failed; the box may be partial.
    pub complete: bool,
    /// Only set for a complete box.
    pub sha256: Option<String>,
}

/// Package a VM directory into `<name>.box`.
pub async fn build_box(options: &BuildOptions, executor: &dyn Executor) -> Result<BuildReport> {
    let files = discover(&options.dir)?;
    files.require_disk_image()?;

    let box_name = resolve_box_name(&options.dir, options.box_name.as_deref())?;

    // Resolve every tool before touching any disk.
    let vdisk = if options.optimize.is_noop() {
        None
    } else {
        Some(VdiskManager::locate(
            options.tools.vdiskmanager.as_deref(),
            options.platform,
        )?)
    };
    let backend = match options.archiver {
        ArchiverChoice::Tar => ArchiveBackend::TarCommand {
            tar: locate_tool(
                "tar",
                options.tools.tar.as_deref(),
                "install tar or use --archiver native",
            )?,
        },
        ArchiverChoice::Native => ArchiveBackend::Native,
    };

    let optimization_passes = match vdisk {
        Some(ref vdisk) => optimize_disks(executor, vdisk, &files, options.optimize).await?,
        None => 0,
    };

    let assembled = assemble_box(
        executor,
        &files,
        &box_name,
        &backend,
        options.best_effort_archive,
    )
    .await?;

    let sha256 = if !assembled.complete {
        warn!(
            "Archiver failed, not checksumming {}",
            assembled.path.display()
        );
        None
    } else if assembled.path.is_file() {
        let digest = write_checksum(&assembled.path)?;
        info!("{} sha256 {}", assembled.path.display(), digest);
        Some(digest)
    } else {
        warn!("No box was written to {}", assembled.path.display());
        None
    };

    Ok(BuildReport {
        box_name,
        box_path: assembled.path,
        files: files.file_names(),
        optimization_passes,
        complete: assembled.complete,
        sha256,
    })
}

/// Inputs to [`register_box`].
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    pub dir: PathBuf,
    pub box_file: Option<String>,
    pub vagrant: Option<PathBuf>,
}

/// What registration did.
#[derive(Debug, Clone)]
pub struct RegisterReport {
    pub box_path: PathBuf,
    pub identity: String,
}

/// Add an existing box to Vagrant and initialize a Vagrantfile from it.
pub async fn register_box(
    options: &RegisterOptions,
    executor: &dyn Executor,
) -> Result<RegisterReport> {
    let box_path = resolve_box_file(&options.dir, options.box_file.as_deref())?;
    let identity = box_identity(&box_path);
    let vagrant = Vagrant::new(locate_tool(
        "vagrant",
        options.vagrant.as_deref(),
        VAGRANT_HINT,
    )?);

    vagrant
        .add_box(executor, &box_path, &identity, &options.dir)
        .await?;
    vagrant.init(executor, &identity, &options.dir).await?;

    Ok(RegisterReport { box_path, identity })
}
