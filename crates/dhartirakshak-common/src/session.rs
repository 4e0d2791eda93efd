//! Session storage.
//!
//! The publishing API hands out opaque bearer tokens. The web front end kept
//! them in browser storage under fixed keys (`admin_token`, `user_profile`
//! and so on); here the same key/value records go through a [`SessionStore`]
//! so callers can keep them in memory, in a JSON file, or anywhere else.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::Display;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Errors emitted by session stores.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum SessionStoreError {
    /// Filesystem or I/O error
    #[error("I/O error: {0}")]
    #[diagnostic(code(dhartirakshak::session_store::io))]
    Io(#[from] std::io::Error),
    /// Serialization error (e.g., JSON)
    #[error("serialization error: {0}")]
    #[diagnostic(code(dhartirakshak::session_store::serde))]
    Serde(#[from] serde_json::Error),
    /// Any other error from a backend implementation
    #[error(transparent)]
    #[diagnostic(code(dhartirakshak::session_store::other))]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

/// Pluggable storage for arbitrary session records.
#[async_trait]
pub trait SessionStore<K, T>: Send + Sync
where
    K: Eq + Hash,
    T: Clone,
{
    /// Get the current session if present.
    async fn get(&self, key: &K) -> Option<T>;
    /// Persist the given session.
    async fn set(&self, key: K, session: T) -> Result<(), SessionStoreError>;
    /// Delete the given session.
    async fn del(&self, key: &K) -> Result<(), SessionStoreError>;
    /// Remove every record.
    async fn clear(&self) -> Result<(), SessionStoreError>;
}

/// In-memory session store suitable for short-lived sessions and tests.
#[derive(Clone)]
pub struct MemorySessionStore<K, T>(Arc<RwLock<HashMap<K, T>>>);

impl<K, T> Default for MemorySessionStore<K, T> {
    fn default() -> Self {
        Self(Arc::new(RwLock::new(HashMap::new())))
    }
}

impl<K, T> MemorySessionStore<K, T>
where
    K: Eq + Hash,
{
    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.0.read().await.len()
    }

    /// True when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.0.read().await.is_empty()
    }
}

#[async_trait]
impl<K, T> SessionStore<K, T> for MemorySessionStore<K, T>
where
    K: Eq + Hash + Send + Sync,
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<T> {
        self.0.read().await.get(key).cloned()
    }
    async fn set(&self, key: K, session: T) -> Result<(), SessionStoreError> {
        self.0.write().await.insert(key, session);
        Ok(())
    }
    async fn del(&self, key: &K) -> Result<(), SessionStoreError> {
        self.0.write().await.remove(key);
        Ok(())
    }
    async fn clear(&self) -> Result<(), SessionStoreError> {
        self.0.write().await.clear();
        Ok(())
    }
}

/// File-backed session store: one JSON object, one entry per key.
///
/// Tokens are written in clear text. Point it at a file only the current
/// user can read.
///
/// Example
/// ```ignore
/// use dhartirakshak_common::session::FileSessionStore;
/// let store = FileSessionStore::new("/tmp/dhartirakshak-session.json");
/// ```
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store backed by `path`. Nothing touches the disk until the
    /// first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>, SessionStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Ok(Map::new()),
            Ok(data) => match serde_json::from_slice::<Value>(&data)? {
                Value::Object(map) => Ok(map),
                _ => Err(SessionStoreError::Other("session file is not a JSON object".into())),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, map: &Map<String, Value>) -> Result<(), SessionStoreError> {
        let buf = serde_json::to_vec_pretty(map)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &buf).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl<K, T> SessionStore<K, T> for FileSessionStore
where
    K: Eq + Hash + Display + Send + Sync + 'static,
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<T> {
        let store = self.load().await.ok()?;
        let session = store.get(&key.to_string())?;
        serde_json::from_value(session.clone()).ok()
    }

    async fn set(&self, key: K, session: T) -> Result<(), SessionStoreError> {
        let mut store = self.load().await?;
        store.insert(key.to_string(), serde_json::to_value(session)?);
        self.save(&store).await
    }

    async fn del(&self, key: &K) -> Result<(), SessionStoreError> {
        let mut store = self.load().await?;
        if store.shift_remove(&key.to_string()).is_some() {
            self.save(&store).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionStoreError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    #[tokio::test]
    async fn file_store_round_trips_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        let missing: Option<Value> = SessionStore::<SmolStr, Value>::get(&store, &SmolStr::new("admin_token")).await;
        assert!(missing.is_none());

        SessionStore::<SmolStr, Value>::set(
            &store,
            SmolStr::new("admin_token"),
            Value::String("tok".into()),
        )
        .await
        .unwrap();
        SessionStore::<SmolStr, Value>::set(
            &store,
            SmolStr::new("admin_user"),
            serde_json::json!({"email": "a@b.c"}),
        )
        .await
        .unwrap();

        let token: Option<Value> = SessionStore::<SmolStr, Value>::get(&store, &SmolStr::new("admin_token")).await;
        assert_eq!(token, Some(Value::String("tok".into())));

        SessionStore::<SmolStr, Value>::del(&store, &SmolStr::new("admin_token"))
            .await
            .unwrap();
        let token: Option<Value> = SessionStore::<SmolStr, Value>::get(&store, &SmolStr::new("admin_token")).await;
        assert!(token.is_none());
        let user: Option<Value> = SessionStore::<SmolStr, Value>::get(&store, &SmolStr::new("admin_user")).await;
        assert_eq!(user, Some(serde_json::json!({"email": "a@b.c"})));

        SessionStore::<SmolStr, Value>::clear(&store).await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn file_store_rejects_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"[1,2,3]").unwrap();
        let store = FileSessionStore::new(&path);
        let res = SessionStore::<SmolStr, Value>::set(
            &store,
            SmolStr::new("user_token"),
            Value::String("x".into()),
        )
        .await;
        assert!(matches!(res, Err(SessionStoreError::Other(_))));
    }
}
