//! Port interface for the persistent key/value option store

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use crmbridge_domain::Result;

/// Persistent string settings (credentials, cached tokens, log toggles).
#[async_trait]
pub trait OptionStore: Send + Sync {
    /// Read one option. Absent keys return `None`.
    async fn get(&self, name: &str) -> Result<Option<String>>;

    /// Insert or replace one option.
    async fn set(&self, name: &str, value: &str) -> Result<()>;

    /// Write several options atomically: either all are stored or none.
    async fn set_many(&self, values: &[(&str, &str)]) -> Result<()>;

    /// Remove several options atomically. Absent keys are ignored.
    async fn delete_many(&self, names: &[&str]) -> Result<()>;
}

/// In-process option store for tests and ephemeral setups.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from pairs.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = values.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self { values: Mutex::new(map) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OptionStore for MemoryOptionStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lock().get(name).cloned())
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        self.lock().insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn set_many(&self, values: &[(&str, &str)]) -> Result<()> {
        let mut map = self.lock();
        for (name, value) in values {
            map.insert((*name).to_string(), (*value).to_string());
        }
        Ok(())
    }

    async fn delete_many(&self, names: &[&str]) -> Result<()> {
        let mut map = self.lock();
        for name in names {
            map.remove(*name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_many_then_delete_many() {
        let store = MemoryOptionStore::with_values([("keep", "1")]);
        store.set_many(&[("a", "x"), ("b", "y")]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("x"));

        store.delete_many(&["a", "b", "missing"]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("keep").await.unwrap().as_deref(), Some("1"));
    }
}
