use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, Utc};

use super::error::AuthError;
use super::token::Credential;

const CONFIG_DIR_NAME: &str = ".caido-mcp";
const TOKEN_FILE_NAME: &str = "token.json";

/// Credentials are considered expired this long before their literal deadline.
pub const DEFAULT_EXPIRY_MARGIN_MINUTES: i64 = 5;

/// Storage abstraction for the single persisted credential.
pub trait CredentialStore: Send + Sync {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Credential>, AuthError>;
    fn save(&self, credential: &Credential) -> Result<(), AuthError>;
    fn delete(&self) -> Result<(), AuthError>;

    fn expiry_margin(&self) -> Duration {
        Duration::minutes(DEFAULT_EXPIRY_MARGIN_MINUTES)
    }

    fn is_expired(&self, credential: &Credential) -> bool {
        self.is_expired_at(credential, Utc::now())
    }

    /// `now + margin >= expires_at`; the boundary itself counts as expired.
    fn is_expired_at(&self, credential: &Credential, now: DateTime<Utc>) -> bool {
        now + self.expiry_margin() >= credential.expires_at
    }
}

/// Configuration for file-backed credential storage.
#[derive(Debug, Clone)]
pub struct CredentialStoreConfig {
    pub dir: PathBuf,
    pub margin: Duration,
}

impl CredentialStoreConfig {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            margin: Duration::minutes(DEFAULT_EXPIRY_MARGIN_MINUTES),
        }
    }

    pub fn with_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    pub fn default_dir() -> PathBuf {
        default_config_dir()
    }
}

impl Default for CredentialStoreConfig {
    fn default() -> Self {
        Self::new(default_config_dir())
    }
}

/// File-backed credential store (`~/.caido-mcp/token.json`).
///
/// The directory is created owner-only (0700) and the record is written
/// owner-only (0600) through a temp file and a rename, so a crash mid-write
/// never leaves a partial record behind.
///
/// # Example
/// ```no_run
/// use caido_mcp::auth::{Credential, CredentialStore, FileCredentialStore};
/// use chrono::{Duration, Utc};
///
/// let store = FileCredentialStore::new_default();
/// store.save(&Credential {
///     access_token: "access".to_string(),
///     refresh_token: None,
///     expires_at: Utc::now() + Duration::days(1),
/// })?;
/// # Ok::<(), caido_mcp::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
    margin: Duration,
}

impl FileCredentialStore {
    pub fn new(config: CredentialStoreConfig) -> Self {
        Self {
            dir: config.dir,
            margin: config.margin,
        }
    }

    pub fn new_default() -> Self {
        Self::new(CredentialStoreConfig::default())
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE_NAME)
    }

    fn ensure_dir(&self) -> Result<(), AuthError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&self.dir)
            .map_err(|err| write_error(&self.dir, err))?;
        // create() leaves the mode of a pre-existing directory alone.
        #[cfg(unix)]
        fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))
            .map_err(|err| write_error(&self.dir, err))?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, AuthError> {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(AuthError::StorageRead(format!("{}: {err}", path.display())));
            }
        };
        let credential: Credential = serde_json::from_str(&raw)
            .map_err(|err| AuthError::StorageRead(format!("{}: {err}", path.display())))?;
        if credential.validate().is_err() {
            tracing::warn!(path = %path.display(), "Stored credential has no access token; ignoring it");
            return Ok(None);
        }
        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        credential.validate()?;
        self.ensure_dir()?;
        let serialized = serde_json::to_vec_pretty(credential)
            .map_err(|err| AuthError::StorageWrite(err.to_string()))?;
        let path = self.path();
        atomic_write(&path, &serialized).map_err(|err| write_error(&path, err))?;
        tracing::debug!(path = %path.display(), expires_at = %credential.expires_at, "Saved credential");
        Ok(())
    }

    fn delete(&self) -> Result<(), AuthError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(write_error(&path, err)),
        }
    }

    fn expiry_margin(&self) -> Duration {
        self.margin
    }
}

fn write_error(path: &Path, err: std::io::Error) -> AuthError {
    AuthError::StorageWrite(format!("{}: {err}", path.display()))
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| TOKEN_FILE_NAME.to_string());
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_path = path.with_file_name(format!(".{file_name}.tmp-{}-{seq}", std::process::id()));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    Ok(())
}

fn default_config_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME))
}
