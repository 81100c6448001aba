//! Memoization of parsed datasets keyed by where they came from.
//!
//! Local files are keyed by a digest of their bytes, so an unchanged file is
//! never parsed twice. Remote sources are keyed by URL and a time bucket, so
//! they are fetched at most once per TTL window. The cache is a plain value
//! owned by the caller.

use crate::error::LoadError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    pub fn parse(s: &str) -> Self {
        let t = s.trim();
        if t.starts_with("http://") || t.starts_with("https://") {
            Source::Url(t.to_string())
        } else {
            Source::Path(PathBuf::from(t))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Content(String),
    Remote { url: String, bucket: u64 },
}

impl SourceKey {
    pub fn content(bytes: &[u8]) -> Self {
        SourceKey::Content(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn remote(url: &str, now: SystemTime, ttl: Duration) -> Self {
        let secs = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let bucket = secs / ttl.as_secs().max(1);
        SourceKey::Remote {
            url: url.to_string(),
            bucket,
        }
    }
}

/// Fetches remote bytes. No retry and no backoff: a failure is final.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let fail = |reason: String| LoadError::Fetch {
            url: url.to_string(),
            reason,
        };
        let resp = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| fail(e.to_string()))?;
        let bytes = resp.bytes().map_err(|e| fail(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

struct Entry<T> {
    stored_at: Instant,
    value: Arc<T>,
}

pub struct DatasetCache<T> {
    ttl: Duration,
    entries: HashMap<SourceKey, Entry<T>>,
}

impl<T> DatasetCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_or_load<F>(&mut self, key: SourceKey, load: F) -> Result<Arc<T>, LoadError>
    where
        F: FnOnce() -> Result<T, LoadError>,
    {
        self.get_or_load_at(key, Instant::now(), load)
    }

    pub(crate) fn get_or_load_at<F>(
        &mut self,
        key: SourceKey,
        now: Instant,
        load: F,
    ) -> Result<Arc<T>, LoadError>
    where
        F: FnOnce() -> Result<T, LoadError>,
    {
        if let Some(entry) = self.entries.get(&key) {
            if now.saturating_duration_since(entry.stored_at) < self.ttl {
                debug!(?key, "dataset cache hit");
                return Ok(Arc::clone(&entry.value));
            }
        }
        debug!(?key, "dataset cache miss");
        let value = Arc::new(load()?);
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.stored_at) < ttl);
        self.entries.insert(
            key,
            Entry {
                stored_at: now,
                value: Arc::clone(&value),
            },
        );
        Ok(value)
    }

    /// Resolve `source` to a parsed dataset, reading or fetching only when
    /// the cache has no live entry for it.
    pub fn load_source<P>(
        &mut self,
        source: &Source,
        fetcher: &dyn Fetch,
        parse: P,
    ) -> Result<Arc<T>, LoadError>
    where
        P: FnOnce(&[u8]) -> Result<T, LoadError>,
    {
        match source {
            Source::Path(path) => {
                let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                self.get_or_load(SourceKey::content(&bytes), || parse(&bytes))
            }
            Source::Url(url) => {
                let key = SourceKey::remote(url, SystemTime::now(), self.ttl);
                self.get_or_load(key, || parse(&fetcher.fetch(url)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingFetcher {
        calls: Cell<usize>,
        body: Result<Vec<u8>, String>,
    }

    impl Fetch for CountingFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
            self.calls.set(self.calls.get() + 1);
            self.body.clone().map_err(|reason| LoadError::Fetch {
                url: url.to_string(),
                reason,
            })
        }
    }

    fn parse_len(bytes: &[u8]) -> Result<usize, LoadError> {
        Ok(bytes.len())
    }

    #[test]
    fn source_kind_is_detected_from_prefix() {
        assert_eq!(
            Source::parse("https://example.com/a.xlsx"),
            Source::Url("https://example.com/a.xlsx".to_string())
        );
        assert_eq!(Source::parse("data.csv"), Source::Path(PathBuf::from("data.csv")));
    }

    #[test]
    fn identical_content_shares_a_key() {
        assert_eq!(SourceKey::content(b"abc"), SourceKey::content(b"abc"));
        assert_ne!(SourceKey::content(b"abc"), SourceKey::content(b"abd"));
    }

    #[test]
    fn remote_keys_roll_over_with_the_bucket() {
        let ttl = Duration::from_secs(3600);
        let t0 = UNIX_EPOCH + Duration::from_secs(7200);
        let a = SourceKey::remote("u", t0, ttl);
        let b = SourceKey::remote("u", t0 + Duration::from_secs(10), ttl);
        let c = SourceKey::remote("u", t0 + Duration::from_secs(3600), ttl);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn loads_once_until_expiry() {
        let mut cache: DatasetCache<usize> = DatasetCache::new(Duration::from_secs(60));
        let key = SourceKey::content(b"x");
        let t0 = Instant::now();
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok(7)
        };

        assert_eq!(*cache.get_or_load_at(key.clone(), t0, load).unwrap(), 7);
        let again = cache
            .get_or_load_at(key.clone(), t0 + Duration::from_secs(30), load)
            .unwrap();
        assert_eq!(*again, 7);
        assert_eq!(loads.get(), 1);

        cache
            .get_or_load_at(key, t0 + Duration::from_secs(61), load)
            .unwrap();
        assert_eq!(loads.get(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entries_are_dropped_on_insert() {
        let mut cache: DatasetCache<usize> = DatasetCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        let old = SourceKey::Remote {
            url: "u".to_string(),
            bucket: 1,
        };
        let new = SourceKey::Remote {
            url: "u".to_string(),
            bucket: 2,
        };
        let live = SourceKey::content(b"z");

        cache.get_or_load_at(old, t0, || Ok(1)).unwrap();
        cache
            .get_or_load_at(live.clone(), t0 + Duration::from_secs(50), || Ok(2))
            .unwrap();
        cache
            .get_or_load_at(new.clone(), t0 + Duration::from_secs(90), || Ok(3))
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.entries.contains_key(&live));
        assert!(cache.entries.contains_key(&new));
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache: DatasetCache<usize> = DatasetCache::new(Duration::from_secs(60));
        let key = SourceKey::content(b"y");
        let err = cache.get_or_load(key.clone(), || Err(LoadError::Empty));
        assert!(err.is_err());
        assert!(cache.is_empty());
        assert_eq!(*cache.get_or_load(key, || Ok(1)).unwrap(), 1);
    }

    #[test]
    fn remote_source_is_fetched_once_per_bucket() {
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            body: Ok(b"hello".to_vec()),
        };
        let mut cache: DatasetCache<usize> = DatasetCache::new(Duration::from_secs(3600));
        let source = Source::Url("https://example.com/meters.csv".to_string());
        assert_eq!(*cache.load_source(&source, &fetcher, parse_len).unwrap(), 5);
        assert_eq!(*cache.load_source(&source, &fetcher, parse_len).unwrap(), 5);
        // a bucket boundary between the two calls allows one extra fetch
        assert!(fetcher.calls.get() <= 2);
    }

    #[test]
    fn fetch_failure_surfaces_as_load_error() {
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            body: Err("connection refused".to_string()),
        };
        let mut cache: DatasetCache<usize> = DatasetCache::new(Duration::from_secs(3600));
        let source = Source::Url("https://example.com/sales.xlsx".to_string());
        let err = cache.load_source(&source, &fetcher, parse_len).unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut cache: DatasetCache<usize> = DatasetCache::new(Duration::from_secs(60));
        let source = Source::Path(PathBuf::from("/nonexistent/meters.csv"));
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            body: Ok(vec![]),
        };
        let err = cache.load_source(&source, &fetcher, parse_len).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
