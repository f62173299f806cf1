//! Market data for the daily runner.
//!
//! - [`CacheStore`]/[`CacheFile`]: the once-per-day price history cache
//! - [`YahooDataSource`], [`CsvDataSource`]: daily bar providers
//! - Universe sources and the [`SymbolFilter`] denylist

mod cache;
mod csv_source;
mod universe;
mod yahoo;

pub use cache::{CacheEntry, CacheFile, CacheLock, CacheLookup, CacheStore, StoredCache};
pub use csv_source::CsvDataSource;
pub use universe::{parse_symbol_list, FileUniverse, HttpCsvUniverse, StaticUniverse, SymbolFilter};
pub use yahoo::YahooDataSource;
