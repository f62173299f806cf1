//! Price history cache.
//!
//! One JSON document holds every symbol's price series and trade metadata
//! under a single epoch date. A store whose epoch is not today is discarded
//! whole before anything is read or written.
//!
//! On disk:
//! - Writes are atomic (write `.tmp`, fsync, rename into place)
//! - Corrupt files are quarantined to `.corrupt` and treated as empty, except
//!   through [`CacheFile::read`], which never touches the disk
//! - The single writer holds an OS advisory lock on a `.lock` file, released
//!   when the handle closes or the process dies

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trading_core::error::{CacheError, DataError};
use trading_core::traits::DataSource;
use trading_core::types::{PriceSeries, Side, TradeMetadata};

/// Cached state for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Price series as fetched, replaced wholesale on a miss
    pub series: PriceSeries,
    /// Epoch the series was fetched under
    pub fetched_on: NaiveDate,
    /// Present once the symbol has been traded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade: Option<TradeMetadata>,
}

/// Whether a lookup was served from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
}

/// Symbol to [`CacheEntry`] map plus the epoch every entry belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStore {
    epoch: NaiveDate,
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheStore {
    /// Empty store stamped with `epoch`.
    pub fn new(epoch: NaiveDate) -> Self {
        Self {
            epoch,
            entries: BTreeMap::new(),
        }
    }

    /// Keep `stored` if it belongs to `current_epoch`, otherwise start over.
    ///
    /// The reset is total: price series and trade metadata both go.
    pub fn reset_if_stale(stored: Option<Self>, current_epoch: NaiveDate) -> Self {
        match stored {
            Some(store) if store.epoch == current_epoch => store,
            Some(store) => {
                info!(
                    stored = %store.epoch,
                    current = %current_epoch,
                    entries = store.entries.len(),
                    "Cache epoch changed, resetting"
                );
                Self::new(current_epoch)
            }
            None => Self::new(current_epoch),
        }
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, symbol: &str) -> Option<&CacheEntry> {
        self.entries.get(symbol)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    /// Trade metadata recorded for `symbol`.
    pub fn trade(&self, symbol: &str) -> Option<&TradeMetadata> {
        self.entries.get(symbol).and_then(|e| e.trade.as_ref())
    }

    /// Return the series for `symbol`, fetching it at most once per epoch.
    pub async fn get_or_fetch(
        &mut self,
        symbol: &str,
        source: &dyn DataSource,
        lookback: usize,
    ) -> Result<(PriceSeries, CacheLookup), DataError> {
        if let Some(entry) = self.entries.get(symbol) {
            if entry.fetched_on == self.epoch {
                debug!(symbol = %symbol, bars = entry.series.len(), "Cache hit");
                return Ok((entry.series.clone(), CacheLookup::Hit));
            }
        }

        debug!(symbol = %symbol, source = source.name(), lookback, "Cache miss, fetching");
        let series = source.get_daily_bars(symbol, lookback).await?;
        self.insert_series(symbol, series.clone());
        Ok((series, CacheLookup::Miss))
    }

    /// Store a freshly fetched series under the current epoch, keeping any
    /// trade metadata already recorded for the symbol.
    pub fn insert_series(&mut self, symbol: &str, series: PriceSeries) {
        let epoch = self.epoch;
        match self.entries.get_mut(symbol) {
            Some(entry) => {
                entry.series = series;
                entry.fetched_on = epoch;
            }
            None => {
                self.entries.insert(
                    symbol.to_string(),
                    CacheEntry {
                        series,
                        fetched_on: epoch,
                        trade: None,
                    },
                );
            }
        }
    }

    /// Update trade metadata after a filled or accepted order.
    ///
    /// Returns `false` if the symbol has no entry to attach metadata to.
    pub fn record_trade(
        &mut self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Option<Decimal>,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(symbol) else {
            return false;
        };

        if let Some(meta) = entry.trade.as_mut() {
            match side {
                Side::Buy => meta.record_buy(quantity, price, at),
                Side::Sell => meta.record_sell(quantity, at),
            }
            return true;
        }

        let meta = match side {
            Side::Buy => TradeMetadata::opened(quantity, price, at),
            Side::Sell => {
                let mut meta = TradeMetadata::opened(Decimal::ZERO, None, at);
                meta.purchased_at = None;
                meta.record_sell(quantity, at);
                meta
            }
        };
        entry.trade = Some(meta);
        true
    }
}

/// What [`CacheFile::read`] found on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredCache {
    Missing,
    Valid(CacheStore),
    /// The file exists but does not parse
    Corrupt(String),
}

/// Backing file for a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn io_error(path: &Path, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Read the stored cache without modifying anything on disk.
    pub fn read(&self) -> Result<StoredCache, CacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache file yet");
                return Ok(StoredCache::Missing);
            }
            Err(e) => return Err(Self::io_error(&self.path, e)),
        };

        match serde_json::from_slice::<CacheStore>(&bytes) {
            Ok(store) => {
                debug!(
                    path = %self.path.display(),
                    epoch = %store.epoch,
                    entries = store.len(),
                    "Loaded cache"
                );
                Ok(StoredCache::Valid(store))
            }
            Err(e) => Ok(StoredCache::Corrupt(e.to_string())),
        }
    }

    /// Load the stored cache for writing.
    ///
    /// A missing file is `Ok(None)`. An unparseable file is moved aside and
    /// also reads as `Ok(None)`. Any other I/O failure is an error. Callers
    /// should hold the [`CacheLock`].
    pub fn load(&self) -> Result<Option<CacheStore>, CacheError> {
        match self.read()? {
            StoredCache::Missing => Ok(None),
            StoredCache::Valid(store) => Ok(Some(store)),
            StoredCache::Corrupt(reason) => {
                let quarantine = self.sibling(".corrupt");
                warn!(
                    path = %self.path.display(),
                    quarantine = %quarantine.display(),
                    error = %reason,
                    "Cache file is corrupt, starting empty"
                );
                fs::rename(&self.path, &quarantine)
                    .map_err(|e| Self::io_error(&self.path, e))?;
                Ok(None)
            }
        }
    }

    /// Like [`load`](Self::load), but a corrupt file is left where it is.
    pub fn load_read_only(&self) -> Result<Option<CacheStore>, CacheError> {
        match self.read()? {
            StoredCache::Missing => Ok(None),
            StoredCache::Valid(store) => Ok(Some(store)),
            StoredCache::Corrupt(reason) => {
                warn!(path = %self.path.display(), error = %reason, "Cache file is corrupt, reading as empty");
                Ok(None)
            }
        }
    }

    /// Write the whole store atomically.
    pub fn persist(&self, store: &CacheStore) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(store)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        let tmp_path = self.sibling(".tmp");
        let write_tmp = || -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()
        };
        if let Err(e) = write_tmp() {
            let _ = fs::remove_file(&tmp_path);
            return Err(Self::io_error(&tmp_path, e));
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Self::io_error(&self.path, e)
        })?;

        debug!(path = %self.path.display(), entries = store.len(), "Persisted cache");
        Ok(())
    }

    /// Take the single-writer lock for this cache file.
    ///
    /// The lock file itself stays on disk. Only a live handle holds the lock,
    /// so a run that crashed or was killed never blocks the next one.
    pub fn lock(&self) -> Result<CacheLock, CacheError> {
        let lock_path = self.sibling(".lock");
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Self::io_error(&lock_path, e))?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(CacheError::Locked(lock_path));
            }
            return Err(Self::io_error(&lock_path, e));
        }

        // Holder pid, for operators
        let _ = file.set_len(0).and_then(|()| writeln!(file, "{}", std::process::id()));
        debug!(path = %lock_path.display(), "Cache lock acquired");
        Ok(CacheLock {
            path: lock_path,
            file,
        })
    }

    /// Delete the cache file. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool, CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(&self.path, e)),
        }
    }
}

/// Held while a run owns the cache file. Unlocks on drop.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
    file: File,
}

impl CacheLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release cache lock");
        }
    }
}
