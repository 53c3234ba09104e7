//! vmbox - Create a Vagrant .box archive from a VMware virtual machine.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vmbox_common::HostPlatform;
use vmbox_packager::tools::ToolOverrides;
use vmbox_packager::vdisk::OptimizeOptions;
use vmbox_packager::workflow::ArchiverChoice;
use vmbox_packager::{build_box, register_box, BuildOptions, LocalExecutor, RegisterOptions};

#[derive(Parser)]
#[command(name = "vmbox")]
#[command(
    author,
    version,
    about = "Create a .BOX archive from VMware files to be used with Vagrant"
)]
struct Cli {
    /// The name of the BOX file that should be created (or registered with --vagrantify)
    #[arg(short = 'b', long = "box_name")]
    box_name: Option<String>,

    /// The source VM directory. Defaults to the current directory
    #[arg(short = 'd', long = "vm_directory_path")]
    vm_directory_path: Option<PathBuf>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Skip defragmenting the VMDKs
    #[arg(long = "skip_defrag")]
    skip_defrag: bool,

    /// Skip shrinking the VMDKs
    #[arg(long = "skip_shrink")]
    skip_shrink: bool,

    /// Add an existing .box to Vagrant and create a Vagrantfile for it
    #[arg(long)]
    vagrantify: bool,

    /// How to write the .box archive
    #[arg(long, value_enum, default_value_t = ArchiverArg::Tar)]
    archiver: ArchiverArg,

    /// Continue when the archiver exits with an error
    #[arg(long = "best_effort_archive")]
    best_effort_archive: bool,

    /// Path to vmware-vdiskmanager
    #[arg(long)]
    vdiskmanager: Option<PathBuf>,

    /// Path to tar
    #[arg(long)]
    tar: Option<PathBuf>,

    /// Path to vagrant
    #[arg(long)]
    vagrant: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ArchiverArg {
    /// External tar command
    Tar,
    /// Built-in tar.gz writer
    Native,
}

impl From<ArchiverArg> for ArchiverChoice {
    fn from(arg: ArchiverArg) -> Self {
        match arg {
            ArchiverArg::Tar => ArchiverChoice::Tar,
            ArchiverArg::Native => ArchiverChoice::Native,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let dir = match cli.vm_directory_path {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let executor = LocalExecutor::new();

    if cli.vagrantify {
        let options = RegisterOptions {
            dir,
            box_file: cli.box_name,
            vagrant: cli.vagrant,
        };

        let report = register_box(&options, &executor).await?;
        info!(
            "Box {} registered as {}",
            report.box_path.display(),
            report.identity
        );
        return Ok(());
    }

    let options = BuildOptions {
        dir,
        box_name: cli.box_name,
        optimize: OptimizeOptions {
            skip_defrag: cli.skip_defrag,
            skip_shrink: cli.skip_shrink,
        },
        archiver: cli.archiver.into(),
        best_effort_archive: cli.best_effort_archive,
        tools: ToolOverrides {
            vdiskmanager: cli.vdiskmanager,
            tar: cli.tar,
        },
        platform: HostPlatform::current(),
    };

    let report = build_box(&options, &executor).await?;
    if report.complete {
        info!("Box written to {:?}", report.box_path);
    } else {
        warn!("Archiver failed, {:?} may be incomplete", report.box_path);
    }

    Ok(())
}
