use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

pub fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Root directory for runtime data (database, logs, config).
///
/// Respects `KAN_ASSET_DIR`. Debug builds default to `dev_assets/` at the
/// workspace root; release builds use the platform data directory.
pub fn asset_dir() -> PathBuf {
    let path = if let Ok(dir) = std::env::var("KAN_ASSET_DIR") {
        expand_tilde(&dir)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        match ProjectDirs::from("so", "kan", "kan") {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => PathBuf::from(".kan"),
        }
    };

    if !path.exists()
        && let Err(e) = std::fs::create_dir_all(&path)
    {
        tracing::warn!(path = %path.display(), error = %e, "Failed to create asset directory");
    }

    path
}

/// Path of the optional JSON config file.
///
/// Respects `KAN_CONFIG_PATH`. Default: `{asset_dir}/config.json`
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("KAN_CONFIG_PATH") {
        return expand_tilde(&path);
    }
    asset_dir().join("config.json")
}

/// Get the database file path.
///
/// Respects `KAN_DATABASE_PATH`. Default: `{asset_dir}/db.sqlite`
pub fn database_path() -> PathBuf {
    if let Ok(path) = std::env::var("KAN_DATABASE_PATH") {
        return expand_tilde(&path);
    }
    asset_dir().join("db.sqlite")
}

pub fn log_dir() -> PathBuf {
    if let Ok(path) = std::env::var("KAN_LOG_DIR") {
        return expand_tilde(&path);
    }
    asset_dir().join("logs")
}
