use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::Result;

/// Name of the log file inside the log directory.
pub const LOG_FILE_NAME: &str = "log.csv";

/// Resolves the directory the tracker writes into. Without an explicit directory the current
/// working directory is used. The directory is created if needed and returned as an absolute
/// path, so it stays valid after a detached tracker changes its working directory.
pub fn resolve_log_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    let path = match dir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => env::current_dir()?.join(dir),
        None => env::current_dir()?,
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn creates_missing_directories() -> Result<()> {
        let root = tempdir()?;
        let nested = root.path().join("a").join("b");

        let resolved = resolve_log_dir(Some(nested.clone()))?;

        assert_eq!(resolved, nested);
        assert!(nested.is_dir());
        assert_eq!(log_file_path(&resolved), nested.join("log.csv"));
        Ok(())
    }
}
