//! Credential storage with change notification
//!
//! The store is the only shared mutable state of a client. Listeners are
//! invoked synchronously, after the backend write has succeeded; a listener
//! registered later does not see earlier changes.

use konata_core::{CoreError, CoreResult, ErrorContext};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Change observed by token listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEvent {
    Set,
    Removed,
}

/// Handle returned by [`TokenStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked on every token change
pub type TokenListener = Arc<dyn Fn(TokenEvent) + Send + Sync>;

/// Durable storage for the raw token value
pub trait TokenBackend: Send + Sync {
    fn load(&self) -> CoreResult<Option<String>>;
    fn store(&self, token: &str) -> CoreResult<()>;
    fn clear(&self) -> CoreResult<()>;
}

/// Process-local backend, lost on exit
#[derive(Debug, Default)]
pub struct MemoryTokenBackend {
    token: Mutex<Option<String>>,
}

impl MemoryTokenBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenBackend for MemoryTokenBackend {
    fn load(&self) -> CoreResult<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store(&self, token: &str) -> CoreResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Backend persisting the token in a single file
#[derive(Debug, Clone)]
pub struct FileTokenBackend {
    path: PathBuf,
}

impl FileTokenBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenBackend for FileTokenBackend {
    fn load(&self) -> CoreResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CoreError::storage_error(format!(
                "reading {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn store(&self, token: &str) -> CoreResult<()> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, token)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
            }
            Ok(())
        };
        write()
            .with_context(|| format!("writing {}", self.path.display()))
            .map_err(CoreError::storage_error)
    }

    fn clear(&self) -> CoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CoreError::storage_error(format!(
                "removing {}: {err}",
                self.path.display()
            ))),
        }
    }
}

struct TokenStoreInner {
    backend: Box<dyn TokenBackend>,
    listeners: Mutex<Vec<(ListenerId, TokenListener)>>,
    next_listener: AtomicU64,
}

/// Shared handle to the stored credential
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<TokenStoreInner>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TokenStore {
    /// Create a store over the given backend
    pub fn new(backend: impl TokenBackend + 'static) -> Self {
        Self {
            inner: Arc::new(TokenStoreInner {
                backend: Box::new(backend),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    /// Store kept only in memory
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenBackend::new())
    }

    /// Store persisted to `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileTokenBackend::new(path))
    }

    /// Current token, trimmed; `None` when absent, blank or unreadable
    pub fn get_token(&self) -> Option<String> {
        match self.inner.backend.load() {
            Ok(token) => token
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            Err(err) => {
                warn!(error = %err, "failed to read stored token");
                None
            }
        }
    }

    /// Persist a new token and notify listeners
    pub fn set_token(&self, token: &str) -> CoreResult<()> {
        self.inner.backend.store(token.trim())?;
        self.notify(TokenEvent::Set);
        Ok(())
    }

    /// Delete the token and notify listeners
    pub fn remove_token(&self) -> CoreResult<()> {
        self.inner.backend.clear()?;
        self.notify(TokenEvent::Removed);
        Ok(())
    }

    /// Register a listener for token changes
    pub fn subscribe(&self, listener: impl Fn(TokenEvent) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    fn listeners(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, TokenListener)>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: TokenEvent) {
        // Snapshot so listeners may (un)subscribe from inside the callback
        let snapshot: Vec<TokenListener> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!(?event, listeners = snapshot.len(), "token changed");
        for listener in snapshot {
            listener(event);
        }
    }
}
