//! Configuration file discovery and data folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "DIAD_DATA_FOLDER";

const APP_DIR: &str = "diad";
const CONFIG_FILE: &str = "config.toml";

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable [`DATA_FOLDER_ENV`]
/// 3. `data_folder` key of the TOML config file
/// 4. OS-dependent compiled default (fallback)
///
/// `config_file` overrides config file discovery for step 3.
pub fn resolve_data_folder(cli_arg: Option<&Path>, config_file: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    let config_path = match config_file {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file().ok(),
    };
    if let Some(path) = config_path {
        match data_folder_from_file(&path) {
            Ok(Some(folder)) => return folder,
            Ok(None) => debug!("No data_folder key in {}", path.display()),
            Err(e) => debug!("Ignoring config file {}: {}", path.display(), e),
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// `data_folder` value of a TOML config file, if present
pub fn data_folder_from_file(path: &Path) -> Result<Option<PathBuf>> {
    let config = read_config_file(path)?;
    Ok(config
        .get("data_folder")
        .and_then(|v| v.as_str())
        .map(PathBuf::from))
}

/// Parse a TOML config file into a generic value
pub fn read_config_file(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str::<toml::Value>(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Locate the configuration file for the platform
///
/// On Linux `~/.config/diad/config.toml` is tried first, then
/// `/etc/diad/config.toml`.
pub fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE);
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data folder path
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "macos") {
        // ~/Library/Application Support/diad
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/diad"))
    } else if cfg!(any(target_os = "linux", target_os = "windows")) {
        // ~/.local/share/diad or %LOCALAPPDATA%\diad
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("./diad_data"))
    } else {
        PathBuf::from("./diad_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_argument_wins() {
        let folder = resolve_data_folder(Some(Path::new("/tmp/diad-cli")), None);
        assert_eq!(folder, PathBuf::from("/tmp/diad-cli"));
    }

    #[test]
    fn test_data_folder_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "data_folder = \"/srv/diad\"\n[player]\nsample_rate = 48000").unwrap();

        let folder = data_folder_from_file(file.path()).unwrap();
        assert_eq!(folder, Some(PathBuf::from("/srv/diad")));
    }

    #[test]
    fn test_missing_key_is_none() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[player]\nsample_rate = 48000").unwrap();

        assert_eq!(data_folder_from_file(file.path()).unwrap(), None);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "data_folder = ").unwrap();

        assert!(matches!(
            read_config_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_default_folder_named_after_app() {
        let folder = default_data_folder();
        assert!(folder.to_string_lossy().contains("diad"));
    }
}
