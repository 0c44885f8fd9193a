//! Local user profile: `{"user": {"name", "email", "created_at"}}` in a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, VoiceGitError};

/// Greeting shown when no profile is configured.
pub const GENERIC_GREETING: &str = "Hello! Run `voicegit configure` to personalize VoiceGit.";

/// Environment variable overriding the profile location.
pub const CONFIG_PATH_ENV: &str = "VOICEGIT_CONFIG";

/// The configured user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub created_at: String,
    /// Fields written by other tools survive a rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserProfile>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// What [`ProfileStore::save_user`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// File-backed profile store.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$VOICEGIT_CONFIG`, else `config.json` under the platform config dir.
    pub fn new_default() -> Self {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::new(default_config_dir().join("config.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the configured user. A missing file or missing `user` record is `Ok(None)`.
    pub fn load(&self) -> Result<Option<UserProfile>> {
        Ok(self.read_file()?.and_then(|file| file.user))
    }

    /// Like [`load`](Self::load), but an unreadable file is logged and treated as absent.
    pub fn load_or_default(&self) -> Option<UserProfile> {
        match self.load() {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring unreadable profile");
                None
            }
        }
    }

    /// Create or update the user record. Updating keeps `created_at` and any
    /// other fields already in the file.
    pub fn save_user(&self, name: &str, email: &str) -> Result<SaveOutcome> {
        let (mut file, outcome) = match self.read_file()? {
            Some(file) => (file, SaveOutcome::Updated),
            None => (ProfileFile::default(), SaveOutcome::Created),
        };

        file.user = Some(match file.user.take() {
            Some(mut user) => {
                user.name = name.to_string();
                user.email = email.to_string();
                user
            }
            None => UserProfile {
                name: name.to_string(),
                email: email.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
                extra: Map::new(),
            },
        });

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        tracing::debug!(path = %self.path.display(), ?outcome, "saved profile");
        Ok(outcome)
    }

    /// "Hello {name}" when configured, otherwise [`GENERIC_GREETING`].
    pub fn greeting(&self) -> String {
        greeting_for(self.load_or_default().as_ref())
    }

    fn read_file(&self) -> Result<Option<ProfileFile>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Some(ProfileFile::default()));
        }
        serde_json::from_str(&raw).map(Some).map_err(|err| {
            VoiceGitError::Configuration(format!("{} is not valid JSON: {err}", self.path.display()))
        })
    }
}

/// Greeting for an optional profile.
pub fn greeting_for(profile: Option<&UserProfile>) -> String {
    match profile {
        Some(user) => format!("Hello {}", user.name),
        None => GENERIC_GREETING.to_string(),
    }
}

fn default_config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "voicegit")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .or_else(|| directories::UserDirs::new().map(|dirs| dirs.home_dir().join(".voicegit")))
        .unwrap_or_else(|| PathBuf::from(".voicegit"))
}
