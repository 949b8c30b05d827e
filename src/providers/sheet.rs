use crate::cache::ReadCache;
use crate::db::SheetStore;
use crate::errors::AppResult;
use crate::models::{RawRecord, Worksheet};
use crate::providers::DataProvider;
use std::time::Duration;

/// Store-backed provider with a read cache in front of it.
#[derive(Debug)]
pub struct SheetProvider {
    store: SheetStore,
    cache: ReadCache,
}

impl SheetProvider {
    pub fn new(store: SheetStore, ttl: Duration) -> Self {
        Self {
            store,
            cache: ReadCache::new(ttl),
        }
    }

    pub fn store(&self) -> &SheetStore {
        &self.store
    }

    /// Runs a write against `sheet`, creating the worksheet first when needed.
    /// The sheet's cache entry is dropped whether or not the write succeeds.
    pub fn write<T, F>(&self, sheet: Worksheet, op: F) -> AppResult<T>
    where
        F: FnOnce(&SheetStore, &[String]) -> AppResult<T>,
    {
        let result = self
            .store
            .worksheet(sheet.name(), sheet.headers())
            .and_then(|headers| op(&self.store, &headers));
        self.cache.invalidate(sheet)?;
        if let Err(error) = &result {
            tracing::warn!(worksheet = sheet.name(), error = %error, "worksheet write failed");
        }
        result
    }

    pub fn refresh(&self) -> AppResult<()> {
        self.cache.clear()
    }
}

impl DataProvider for SheetProvider {
    fn name(&self) -> &'static str {
        "sheet"
    }

    fn records(&self, sheet: Worksheet) -> AppResult<Vec<RawRecord>> {
        self.cache.get_or_load(sheet, || {
            self.store.worksheet(sheet.name(), sheet.headers())?;
            self.store.get_all_records(sheet.name())
        })
    }

    fn writer(&self) -> AppResult<&SheetProvider> {
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::SheetProvider;
    use crate::db::SheetStore;
    use crate::models::Worksheet;
    use crate::providers::DataProvider;
    use serde_json::json;
    use std::time::Duration;

    fn provider(dir: &tempfile::TempDir) -> SheetProvider {
        let store = SheetStore::create(&dir.path().join("sheet.db"), "Beevent_Database").expect("store");
        SheetProvider::new(store, Duration::from_secs(60))
    }

    #[test]
    fn reading_a_missing_worksheet_creates_it_with_headers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = provider(&dir);
        assert!(provider.records(Worksheet::Staff).expect("records").is_empty());
        let headers = provider.store().headers("Staff").expect("headers").expect("created");
        assert_eq!(headers[1], "Họ tên");
    }

    #[test]
    fn cached_reads_are_replaced_after_a_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = provider(&dir);
        assert!(provider.records(Worksheet::SalesPipeline).expect("records").is_empty());

        // Direct store writes bypass the cache and stay invisible within the TTL.
        provider
            .store()
            .append_row("sales_pipeline", &[json!("Lead"), json!(3), json!(10)])
            .expect("append");
        assert!(provider.records(Worksheet::SalesPipeline).expect("records").is_empty());

        provider
            .write(Worksheet::SalesPipeline, |store, _| {
                store.append_row("sales_pipeline", &[json!("Won"), json!(1), json!(5)])
            })
            .expect("write");
        assert_eq!(provider.records(Worksheet::SalesPipeline).expect("records").len(), 2);
    }
}
