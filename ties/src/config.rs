//! Command line arguments and path resolution.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory name under the data home.
const APP_DIR: &str = "ties";

/// File name of the document.
pub const STORE_FILE_NAME: &str = "data.json";

/// File name of the log, next to the document unless overridden.
pub const LOG_FILE_NAME: &str = "ties.log";

/// Errors resolving the runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error creating directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ties - keep track of people and the ties between them.
#[derive(Debug, Parser)]
#[command(name = "ties")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the JSON document
    #[arg(long, env = "TIES_DB")]
    pub db: Option<PathBuf>,

    /// Path to the log file
    #[arg(long, env = "TIES_LOG")]
    pub log: Option<PathBuf>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_path: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    /// Resolve paths from arguments and the environment.
    pub fn from_args(args: Args) -> Self {
        let xdg = std::env::var_os("XDG_DATA_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::resolve(args, xdg, dirs::home_dir())
    }

    fn resolve(args: Args, xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> Self {
        let store_path = args
            .db
            .unwrap_or_else(|| default_store_path(xdg_data_home, home));
        let log_path = args
            .log
            .unwrap_or_else(|| sibling(&store_path, LOG_FILE_NAME));
        Self {
            store_path,
            log_path,
        }
    }

    /// Create the directory holding the document.
    pub fn ensure_store_dir(&self) -> Result<(), ConfigError> {
        let Some(dir) = self.store_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };
        fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
    }
}

/// `$XDG_DATA_HOME/ties/data.json`, else `~/.local/share/ties/data.json`,
/// else `./data.json`.
fn default_store_path(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(xdg) = xdg_data_home {
        return xdg.join(APP_DIR).join(STORE_FILE_NAME);
    }
    match home {
        Some(home) => home
            .join(".local")
            .join("share")
            .join(APP_DIR)
            .join(STORE_FILE_NAME),
        None => PathBuf::from(STORE_FILE_NAME),
    }
}

fn sibling(path: &Path, file_name: &str) -> PathBuf {
    match path.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_args() -> Args {
        Args { db: None, log: None }
    }

    #[test]
    fn test_explicit_db_wins() {
        let args = Args {
            db: Some(PathBuf::from("/tmp/x/people.json")),
            log: None,
        };
        let config = Config::resolve(args, Some(PathBuf::from("/xdg")), None);
        assert_eq!(config.store_path, PathBuf::from("/tmp/x/people.json"));
        assert_eq!(config.log_path, PathBuf::from("/tmp/x/ties.log"));
    }

    #[test]
    fn test_xdg_data_home() {
        let config = Config::resolve(
            no_args(),
            Some(PathBuf::from("/xdg")),
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(config.store_path, PathBuf::from("/xdg/ties/data.json"));
    }

    #[test]
    fn test_home_fallback() {
        let config = Config::resolve(no_args(), None, Some(PathBuf::from("/home/u")));
        assert_eq!(
            config.store_path,
            PathBuf::from("/home/u/.local/share/ties/data.json")
        );
    }

    #[test]
    fn test_working_directory_fallback() {
        let config = Config::resolve(no_args(), None, None);
        assert_eq!(config.store_path, PathBuf::from("data.json"));
        assert_eq!(config.log_path, PathBuf::from("ties.log"));
    }

    #[test]
    fn test_explicit_log_path() {
        let args = Args {
            db: None,
            log: Some(PathBuf::from("/var/log/ties.log")),
        };
        let config = Config::resolve(args, None, None);
        assert_eq!(config.log_path, PathBuf::from("/var/log/ties.log"));
    }

    #[test]
    fn test_ensure_store_dir_creates_parents() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store_path = temp_dir.path().join("a").join("b").join("data.json");
        let config = Config {
            log_path: sibling(&store_path, LOG_FILE_NAME),
            store_path,
        };
        config.ensure_store_dir().expect("directory creation should succeed");
        assert!(temp_dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn test_ensure_store_dir_reports_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("file");
        fs::write(&blocker, "").expect("write blocker");
        let config = Config {
            store_path: blocker.join("data.json"),
            log_path: PathBuf::from("ties.log"),
        };
        assert!(matches!(
            config.ensure_store_dir(),
            Err(ConfigError::CreateDir { .. })
        ));
    }
}
