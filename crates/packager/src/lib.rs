//! vmbox packager - turns a VMware machine directory into a Vagrant box.

pub mod archive;
pub mod discovery;
pub mod executor;
pub mod naming;
pub mod tools;
pub mod vagrant;
pub mod vdisk;
pub mod workflow;

pub use discovery::{discover, ManagedFile, ManagedFileSet};
pub use executor::{CommandOutput, CommandSpec, Executor, LocalExecutor, OutputMode};
pub use workflow::{build_box, register_box, BuildOptions, BuildReport, RegisterOptions, RegisterReport};
