//! Typed key/value persistence for renderer state plus observable boolean
//! parameters with explicit observer registration.

use crate::geometry::RectI;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// JSON-backed key/value store. Reads return a typed default on miss or on a
/// type mismatch; `flush` persists the whole map.
pub struct Settings {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Value>,
}

impl Settings {
    /// Opens the store backed by the given file. A missing or unreadable
    /// file yields an empty store; defaults cover every key until saved.
    pub fn open(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self {
            path: Some(path),
            entries,
        }
    }

    /// In-memory store without persistence, for embedded use and tests.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.entries
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or(default)
    }

    /// Like `get_or` but reports whether the key was actually present,
    /// so callers can distinguish a stored value from the default.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        if let Ok(json) = serde_json::to_value(value) {
            self.entries.insert(key.to_owned(), json);
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_or(key, default)
    }

    pub fn get_rect(&self, key: &str) -> Option<RectI> {
        self.get_opt::<RectI>(key).filter(RectI::is_valid)
    }

    pub fn flush(&self) -> SettingsResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// Handle identifying a registered observer, used to drop it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

/// Named boolean parameter notifying registered observers on change.
/// Observers run on the thread performing the mutation.
pub struct BoolParam {
    name: &'static str,
    value: bool,
    next_observer: u64,
    observers: Vec<(ObserverId, Box<dyn Fn(bool) + Send>)>,
}

impl BoolParam {
    pub fn new(name: &'static str, value: bool) -> Self {
        Self {
            name,
            value,
            next_observer: 0,
            observers: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> bool {
        self.value
    }

    /// Sets the value, notifying observers only on an actual transition.
    pub fn set_value(&mut self, value: bool) {
        if self.value == value {
            return;
        }
        self.value = value;
        log::debug!("[settings] parameter '{}' -> {}", self.name, value);
        for (_, observer) in &self.observers {
            observer(value);
        }
    }

    pub fn observe<F: Fn(bool) + Send + 'static>(&mut self, observer: F) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unobserve(&mut self, id: ObserverId) {
        self.observers.retain(|(existing, _)| *existing != id);
    }
}
