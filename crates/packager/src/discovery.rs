//! Discovery of the files that belong in a box.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use vmbox_box_schema::{BoxMetadata, FileKind, METADATA_FILE_NAME};
use vmbox_common::{Error, Result};

/// An allow-listed file inside the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub path: PathBuf,
    pub kind: FileKind,
}

impl ManagedFile {
    /// File name as stored in the archive.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The non-empty, ordered set of files packaged into a box.
#[derive(Debug, Clone)]
pub struct ManagedFileSet {
    dir: PathBuf,
    files: Vec<ManagedFile>,
}

impl ManagedFileSet {
    /// Build a set from explicit paths, dropping anything not on the allow-list.
    #[cfg(test)]
    pub(crate) fn from_paths<I>(dir: &Path, paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let files: Vec<ManagedFile> = paths
            .into_iter()
            .filter_map(|path| FileKind::classify(&path).map(|kind| ManagedFile { path, kind }))
            .collect();

        if files.is_empty() {
            return Err(Error::NoManagedFiles {
                dir: dir.to_path_buf(),
            });
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[ManagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn of_kind(&self, kind: FileKind) -> impl Iterator<Item = &ManagedFile> {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    pub fn disk_images(&self) -> impl Iterator<Item = &ManagedFile> {
        self.of_kind(FileKind::DiskImage)
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(ManagedFile::file_name).collect()
    }

    /// Fail unless at least one `.vmdk` is present.
    pub fn require_disk_image(&self) -> Result<()> {
        if self.disk_images().next().is_none() {
            return Err(Error::MissingDiskImage {
                dir: self.dir.clone(),
            });
        }
        Ok(())
    }
}

/// List allow-listed files in `dir`, in directory-listing order.
pub fn scan(dir: &Path) -> Result<Vec<ManagedFile>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(kind) = FileKind::classify(&path) {
            files.push(ManagedFile { path, kind });
        }
    }

    Ok(files)
}

/// Write `metadata.json` if missing. Returns true when the file was created.
///
/// An existing file is never rewritten; problems with it are only reported.
pub fn ensure_metadata(dir: &Path) -> Result<bool> {
    let path = dir.join(METADATA_FILE_NAME);

    if path.exists() {
        if let Some(issue) = BoxMetadata::inspect(&path)? {
            warn!("{}", issue);
        }
        return Ok(false);
    }

    BoxMetadata::write_default(dir)?;
    info!("Created {}", path.display());
    Ok(true)
}

/// Discover the managed file set of a VM directory.
///
/// A directory without any VMware file fails before `metadata.json` is
/// written, so unrelated directories are left untouched.
pub fn discover(dir: &Path) -> Result<ManagedFileSet> {
    debug!("Checking {:?} for valid files...", dir);

    let has_vm_files = scan(dir)?
        .iter()
        .any(|f| f.kind != FileKind::PackageMetadata);
    if !has_vm_files {
        return Err(Error::NoManagedFiles {
            dir: dir.to_path_buf(),
        });
    }

    ensure_metadata(dir)?;
    let files = scan(dir)?;

    debug!("{} valid VMware files found", files.len());
    for (i, file) in files.iter().enumerate() {
        debug!("    {}. {} ({})", i + 1, file.file_name(), file.kind);
    }

    Ok(ManagedFileSet {
        dir: dir.to_path_buf(),
        files,
    })
}
