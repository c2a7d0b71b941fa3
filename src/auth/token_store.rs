use crate::auth::models::Credential;
use crate::error::StorageError;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use url::Url;

/// Durable holder for the bearer token. Performs no validation.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<Credential>, StorageError>;
    fn set(&self, credential: &Credential) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Keeps the raw token string in a single file, readable only by its owner.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// One token file per backend origin under `dir`, so a token issued by one
    /// backend is never presented to another.
    pub fn for_origin(dir: impl AsRef<Path>, base_url: &Url) -> Self {
        Self::new(dir.as_ref().join(origin_key(base_url)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<Credential>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential::new(token)))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn set(&self, credential: &Credential) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        // `mode` only applies on creation; tighten files left by older versions too.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        file.write_all(credential.as_str().as_bytes())
            .map_err(|e| StorageError::Io(e.to_string()))?;
        debug!("Stored credential at {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed credential at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

/// File name for the token of the backend at `base_url`: `<scheme>_<host>_<port>`.
pub fn origin_key(base_url: &Url) -> String {
    let host = base_url.host_str().unwrap_or("local");
    let port = base_url
        .port_or_known_default()
        .map(|p| p.to_string())
        .unwrap_or_default();
    format!("{}_{}_{}", base_url.scheme(), host, port)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(Credential::new(token))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<Credential>, StorageError> {
        let token = self.token.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(token.clone())
    }

    fn set(&self, credential: &Credential) -> Result<(), StorageError> {
        let mut token = self.token.lock().map_err(|_| StorageError::Poisoned)?;
        *token = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut token = self.token.lock().map_err(|_| StorageError::Poisoned)?;
        *token = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));

        assert_eq!(store.get().unwrap(), None);

        store.set(&Credential::new("abc.def.ghi")).unwrap();
        assert_eq!(store.get().unwrap(), Some(Credential::new("abc.def.ghi")));

        // A second store on the same path sees the token, as after a restart.
        let reopened = FileTokenStore::new(store.path());
        assert_eq!(reopened.get().unwrap(), Some(Credential::new("abc.def.ghi")));

        store.clear().unwrap();
        assert_eq!(reopened.get().unwrap(), None);
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_file_store_empty_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "\n").unwrap();
        assert_eq!(FileTokenStore::new(path).get().unwrap(), None);
    }

    #[test]
    fn test_file_store_read_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        // The path is a directory, so reading it fails with something other than NotFound.
        let store = FileTokenStore::new(dir.path());
        assert!(matches!(store.get(), Err(StorageError::Io(_))));
    }

    #[test]
    fn test_origin_key() {
        let url = Url::parse("http://localhost:8000/api").unwrap();
        assert_eq!(origin_key(&url), "http_localhost_8000");

        let url = Url::parse("https://portal.example.org/api/").unwrap();
        assert_eq!(origin_key(&url), "https_portal.example.org_443");

        let url = Url::parse("http://[::1]:9000/api").unwrap();
        assert_eq!(origin_key(&url), "http___1__9000");
    }

    #[test]
    fn test_file_store_scoped_per_origin() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileTokenStore::for_origin(dir.path(), &Url::parse("http://127.0.0.1:8000/api").unwrap());
        let b = FileTokenStore::for_origin(dir.path(), &Url::parse("http://127.0.0.1:9000/api").unwrap());
        let a_again = FileTokenStore::for_origin(dir.path(), &Url::parse("http://127.0.0.1:8000/other").unwrap());

        a.set(&Credential::new("issued.by.a")).unwrap();
        assert_eq!(b.get().unwrap(), None);
        assert_eq!(a_again.get().unwrap(), Some(Credential::new("issued.by.a")));

        b.clear().unwrap();
        assert_eq!(a.get().unwrap(), Some(Credential::new("issued.by.a")));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let store = FileTokenStore::new(&path);

        store.set(&Credential::new("abc.def.ghi")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        // A file created world-readable by something else is tightened on the next write.
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        store.set(&Credential::new("new.token.value")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(store.get().unwrap(), Some(Credential::new("new.token.value")));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::with_token("t");
        assert_eq!(store.get().unwrap(), Some(Credential::new("t")));
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }
}
