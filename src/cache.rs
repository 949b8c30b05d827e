use crate::errors::{AppError, AppResult};
use crate::models::{RawRecord, Worksheet};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedRead {
    records: Vec<RawRecord>,
    fetched_at: Instant,
}

/// Per-worksheet read cache. Entries expire after the TTL and every write to a
/// worksheet drops its entry; a zero TTL disables caching.
#[derive(Debug)]
pub struct ReadCache {
    ttl: Duration,
    entries: Mutex<HashMap<Worksheet, CachedRead>>,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<Worksheet, CachedRead>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("read cache lock poisoned".to_string()))
    }

    pub fn get(&self, sheet: Worksheet) -> AppResult<Option<Vec<RawRecord>>> {
        let mut entries = self.lock()?;
        match entries.get(&sheet) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => Ok(Some(entry.records.clone())),
            Some(_) => {
                entries.remove(&sheet);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn put(&self, sheet: Worksheet, records: Vec<RawRecord>) -> AppResult<()> {
        if self.ttl.is_zero() {
            return Ok(());
        }
        self.lock()?.insert(
            sheet,
            CachedRead {
                records,
                fetched_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Cached records when still fresh, otherwise `load` and remember the result.
    /// Failed loads are not cached.
    pub fn get_or_load<F>(&self, sheet: Worksheet, load: F) -> AppResult<Vec<RawRecord>>
    where
        F: FnOnce() -> AppResult<Vec<RawRecord>>,
    {
        if let Some(records) = self.get(sheet)? {
            tracing::debug!(worksheet = sheet.name(), "read cache hit");
            return Ok(records);
        }
        let records = load()?;
        self.put(sheet, records.clone())?;
        Ok(records)
    }

    pub fn invalidate(&self, sheet: Worksheet) -> AppResult<()> {
        self.lock()?.remove(&sheet);
        Ok(())
    }

    pub fn clear(&self) -> AppResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ReadCache;
    use crate::errors::AppError;
    use crate::models::{RawRecord, Worksheet};
    use std::cell::Cell;
    use std::time::Duration;

    fn one_row() -> Vec<RawRecord> {
        vec![RawRecord::from([("ID".to_string(), serde_json::json!("PRJ0001"))])]
    }

    #[test]
    fn fresh_entries_skip_the_loader() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let loads = Cell::new(0);
        for _ in 0..3 {
            let records = cache
                .get_or_load(Worksheet::Projects, || {
                    loads.set(loads.get() + 1);
                    Ok(one_row())
                })
                .expect("load");
            assert_eq!(records.len(), 1);
        }
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn invalidation_forces_a_reload() {
        let cache = ReadCache::new(Duration::from_secs(60));
        cache.put(Worksheet::Staff, one_row()).expect("put");
        cache.invalidate(Worksheet::Staff).expect("invalidate");
        assert!(cache.get(Worksheet::Staff).expect("get").is_none());

        cache.put(Worksheet::Staff, one_row()).expect("put");
        cache.clear().expect("clear");
        assert!(cache.get(Worksheet::Staff).expect("get").is_none());
    }

    #[test]
    fn expired_and_disabled_entries_are_misses() {
        let cache = ReadCache::new(Duration::from_millis(1));
        cache.put(Worksheet::Timeline, one_row()).expect("put");
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get(Worksheet::Timeline).expect("get").is_none());

        let disabled = ReadCache::new(Duration::ZERO);
        disabled.put(Worksheet::Timeline, one_row()).expect("put");
        assert!(disabled.get(Worksheet::Timeline).expect("get").is_none());
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let error = cache
            .get_or_load(Worksheet::Customers, || {
                Err(AppError::Connectivity("offline".to_string()))
            })
            .expect_err("load fails");
        assert!(error.to_string().starts_with("STORE_UNAVAILABLE"));
        assert!(cache.get(Worksheet::Customers).expect("get").is_none());
    }
}
