//! Environment loading

use std::path::PathBuf;

/// Load environment variables from .env files in multiple locations
///
/// Priority order (highest to lowest):
/// 1. Environment variables already set
/// 2. Current directory .env
/// 3. ~/.gameguides/.env
///
/// Runs before tracing is up, so it returns a description of each file it
/// loaded for the caller to log.
pub fn load_dotenv() -> Vec<String> {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(format!("current directory ({})", path.display()));
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        // dotenvy doesn't overwrite existing vars, so the cwd file wins
        if env_file.exists() && dotenvy::from_path(&env_file).is_ok() {
            loaded_from.push(format!("~/.gameguides/.env ({})", env_file.display()));
        }
    }

    loaded_from
}

/// Get the gameguides config directory path (~/.gameguides)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".gameguides"))
}
