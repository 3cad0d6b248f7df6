use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{LoginResponse, UserInfo};

// ─── Stored session ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: UserInfo,
    pub logged_in_at: DateTime<Utc>,
}

impl From<LoginResponse> for SessionData {
    fn from(login: LoginResponse) -> Self {
        Self {
            access_token: login.token,
            refresh_token: login.refresh_token,
            user: UserInfo {
                id: login.id,
                email: login.email,
                role: login.role,
            },
            logged_in_at: Utc::now(),
        }
    }
}

// ─── Path ────────────────────────────────────────────────────────────────────

fn session_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("droplet-console").join("session.json"))
}

// ─── I/O ─────────────────────────────────────────────────────────────────────

pub fn load_session() -> Option<SessionData> {
    load_session_from(&session_path()?)
}

pub fn save_session(data: &SessionData) -> Result<()> {
    let path = session_path().ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    save_session_to(&path, data)
}

/// Forget the stored session. A missing file is not an error.
pub fn clear_session() -> Result<()> {
    let path = session_path().ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    clear_session_at(&path)
}

pub fn load_session_from(path: &Path) -> Option<SessionData> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Tokens are written to a fresh owner-only file, then renamed over the old
/// session so a pre-existing file's permissions never apply.
pub fn save_session_to(path: &Path, data: &SessionData) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;

    let tmp = path.with_extension("json.tmp");
    remove_if_present(&tmp)?;
    let mut file = create_private(&tmp)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn clear_session_at(path: &Path) -> Result<()> {
    remove_if_present(path)
}

fn create_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionData {
        SessionData::from(LoginResponse {
            id: "u-1".into(),
            email: "ann@school.example".into(),
            role: "admin".into(),
            token: "access".into(),
            refresh_token: Some("refresh".into()),
        })
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("droplet").join("session.json");

        save_session_to(&path, &sample()).unwrap();
        let loaded = load_session_from(&path).unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.user.email, "ann@school.example");
        assert!(loaded.user.is_admin());

        clear_session_at(&path).unwrap();
        assert!(load_session_from(&path).is_none());
        // Clearing twice is fine.
        clear_session_at(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        save_session_to(&path, &sample()).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(load_session_from(&path).unwrap().refresh_token.as_deref(), Some("refresh"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_reads_as_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_session_from(&path).is_none());
    }
}
