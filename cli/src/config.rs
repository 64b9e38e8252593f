use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use stride_core::auth::{AuthState, Session};

#[derive(Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

/// Cloud document-store endpoint, as configured by `stride remote set`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "stride").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("stride.db");

        Ok(Config { db_path, data_dir })
    }

    /// Load the serve-mode API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        restrict_permissions(&path)?;
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok((key, true))
    }

    // --- Remote endpoint settings ---

    fn remote_path(&self) -> PathBuf {
        self.data_dir.join("remote.json")
    }

    pub fn load_remote(&self) -> Result<Option<RemoteSettings>> {
        let path = self.remote_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).context("Failed to read remote settings")?;
        let settings = serde_json::from_str(&raw).context("Failed to parse remote settings")?;
        Ok(Some(settings))
    }

    pub fn save_remote(&self, settings: &RemoteSettings) -> Result<()> {
        let raw = serde_json::to_string_pretty(settings)?;
        std::fs::write(self.remote_path(), raw).context("Failed to write remote settings")?;
        Ok(())
    }

    // --- Session ---

    fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn load_session(&self) -> Result<Option<Session>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let session = serde_json::from_str(&raw).context("Failed to parse session file")?;
        Ok(Some(session))
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        let path = self.session_path();
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&path, raw).context("Failed to write session file")?;
        restrict_permissions(&path)?;
        Ok(())
    }

    /// Remove the stored session. Returns false when none existed.
    pub fn clear_session(&self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).context("Failed to remove session file")?;
        Ok(true)
    }

    /// Current authentication status as the sync machinery sees it.
    /// An unreadable session file maps to `Unknown`, never to a guess.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        match self.load_session() {
            Ok(Some(session)) => session.auth_state(),
            Ok(None) => AuthState::SignedOut,
            Err(_) => AuthState::Unknown,
        }
    }
}

fn restrict_permissions(path: &std::path::Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
