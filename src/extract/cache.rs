//! Memoization of extraction results keyed by `(url, selector)`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::ExtractError;

#[derive(Debug, Clone)]
struct Entry {
    value: Option<String>,
    stored_at: Instant,
}

/// Thread-safe extraction cache.
///
/// Holds successful values and selector misses. Transient failures are
/// never stored so the next request tries again.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: Mutex<HashMap<(String, String), Entry>>,
    ttl: Option<Duration>,
}

impl ExtractionCache {
    /// Create a cache. `ttl` of `None` keeps entries until the process ends.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up a cached outcome.
    pub fn get(&self, url: &str, selector: &str) -> Option<Result<String, ExtractError>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let key = (url.to_string(), selector.to_string());
        let entry = entries.get(&key)?;

        if let Some(ttl) = self.ttl {
            if entry.stored_at.elapsed() > ttl {
                entries.remove(&key);
                return None;
            }
        }

        Some(entry.value.clone().ok_or(ExtractError::NoMatch))
    }

    /// Store an outcome if it is cacheable.
    pub fn put(&self, url: &str, selector: &str, outcome: &Result<String, ExtractError>) {
        let value = match outcome {
            Ok(value) => Some(value.clone()),
            Err(ExtractError::NoMatch) => None,
            Err(_) => return,
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            (url.to_string(), selector.to_string()),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
