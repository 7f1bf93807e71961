//! The in-memory map behind the server
//!
//! Expiry is lazy: an entry past its deadline is removed by whichever
//! operation touches it next, and behaves as absent from then on.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("value for '{0}' is not an integer")]
    NotAnInteger(String),
    #[error("increment or decrement overflows")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: String,
    pub expires_at: Option<SystemTime>,
}

#[derive(Debug, Default)]
pub struct Store {
    map: HashMap<String, Entry>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key. Any previous expiry is discarded.
    pub fn set(&mut self, key: String, value: String) {
        self.map.insert(
            key,
            Entry {
                value,
                expires_at: None,
            },
        );
    }

    pub fn get(&mut self, key: &str) -> Option<&str> {
        self.purge_expired(key);
        self.map.get(key).map(|entry| entry.value.as_str())
    }

    /// Remove a key, reporting whether it was present
    pub fn del(&mut self, key: &str) -> bool {
        self.purge_expired(key);
        self.map.remove(key).is_some()
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.purge_expired(key);
        self.map.contains_key(key)
    }

    /// Arm an expiry deadline `lifetime` from now, reporting whether the key
    /// was present. A lifetime too large to represent as a `SystemTime` can
    /// never fire and is stored as no deadline.
    pub fn expire(&mut self, key: &str, lifetime: Duration) -> bool {
        self.purge_expired(key);
        match self.map.get_mut(key) {
            Some(entry) => {
                entry.expires_at = SystemTime::now().checked_add(lifetime);
                true
            }
            None => false,
        }
    }

    pub fn incr(&mut self, key: &str) -> Result<i64, StoreError> {
        self.step(key, 1)
    }

    pub fn decr(&mut self, key: &str) -> Result<i64, StoreError> {
        self.step(key, -1)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Used by persistence when rebuilding a store from a snapshot
    pub fn insert_entry(&mut self, key: String, entry: Entry) {
        self.map.insert(key, entry);
    }

    /// Iterate the live entries, skipping any that have already expired
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        let now = SystemTime::now();
        self.map
            .iter()
            .filter(move |(_, entry)| entry.expires_at.map_or(true, |at| at > now))
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// A missing key counts from 0; an existing expiry survives the rewrite
    fn step(&mut self, key: &str, delta: i64) -> Result<i64, StoreError> {
        self.purge_expired(key);

        let (current, expires_at) = match self.map.get(key) {
            Some(entry) => {
                let n = entry
                    .value
                    .parse::<i64>()
                    .map_err(|_| StoreError::NotAnInteger(key.to_string()))?;
                (n, entry.expires_at)
            }
            None => (0, None),
        };

        let next = current.checked_add(delta).ok_or(StoreError::Overflow)?;
        self.map.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    fn purge_expired(&mut self, key: &str) {
        let expired = matches!(
            self.map.get(key).and_then(|entry| entry.expires_at),
            Some(at) if at <= SystemTime::now()
        );
        if expired {
            log::debug!("'{}' expired, removing", key);
            self.map.remove(key);
        }
    }
}
