/// Physical relocation of files into destination directories.
///
/// Moves are plain renames. A destination on another volume is reported as a
/// failure; there is no copy-and-delete fallback.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while moving a file.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Failed to create the destination directory or one of its parents.
    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// The source path ends in `..` or is a root.
    #[error("{} has no file name component", .0.display())]
    MissingFileName(PathBuf),
    /// Source and destination live on different filesystems.
    #[error("cannot move {} to {}: destination is on another volume", from.display(), to.display())]
    CrossDevice { from: PathBuf, to: PathBuf },
    /// The rename itself failed.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Result type for move operations.
pub type MoveResult<T> = Result<T, MoveError>;

/// Moves files into destination directories.
pub struct FileMover;

impl FileMover {
    /// Moves `source` into `destination_dir`, keeping its base name.
    ///
    /// Missing directories along `destination_dir` are created first (mode
    /// `0755` on Unix). A file already present at the final path is replaced.
    ///
    /// # Returns
    ///
    /// The path the file now lives at.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mvgo::mover::FileMover;
    /// use std::path::Path;
    ///
    /// match FileMover::move_into(Path::new("/inbox/a.csv"), Path::new("/out/csv")) {
    ///     Ok(dest) => println!("Moved to {}", dest.display()),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    pub fn move_into(source: &Path, destination_dir: &Path) -> MoveResult<PathBuf> {
        let file_name = source
            .file_name()
            .ok_or_else(|| MoveError::MissingFileName(source.to_path_buf()))?;

        create_dir_all(destination_dir).map_err(|e| MoveError::DirectoryCreationFailed {
            path: destination_dir.to_path_buf(),
            source: e,
        })?;

        let destination = destination_dir.join(file_name);

        fs::rename(source, &destination).map_err(|e| {
            if e.kind() == io::ErrorKind::CrossesDevices {
                MoveError::CrossDevice {
                    from: source.to_path_buf(),
                    to: destination.clone(),
                }
            } else {
                MoveError::RenameFailed {
                    from: source.to_path_buf(),
                    to: destination.clone(),
                    source: e,
                }
            }
        })?;

        Ok(destination)
    }
}

#[cfg(unix)]
fn create_dir_all(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o755).create(path)
}

#[cfg(not(unix))]
fn create_dir_all(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}
