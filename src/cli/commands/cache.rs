//! Cache inspection commands.

use anyhow::{Context, Result};
use chrono::Local;
use trading_config::AppConfig;
use trading_data::{CacheFile, StoredCache};

use crate::cli::CacheCommand;

pub fn run(command: CacheCommand, config: &AppConfig) -> Result<()> {
    let cache = CacheFile::new(config.cache.path.clone());
    match command {
        CacheCommand::Status => status(&cache),
        CacheCommand::Clear => clear(&cache),
    }
}

fn status(cache: &CacheFile) -> Result<()> {
    println!("Cache file: {}", cache.path().display());

    let store = match cache.read().context("Failed to read cache")? {
        StoredCache::Valid(store) => store,
        StoredCache::Missing => {
            println!("No cache yet.");
            return Ok(());
        }
        StoredCache::Corrupt(reason) => {
            println!("Corrupt: {}", reason);
            println!("The next run moves it aside and starts empty.");
            return Ok(());
        }
    };

    let today = Local::now().date_naive();
    let state = if store.epoch() == today {
        "current"
    } else {
        "stale, resets on next run"
    };
    println!("Epoch: {} ({})", store.epoch(), state);
    println!("Entries: {}", store.len());
    println!();

    for (symbol, entry) in store.entries() {
        let last = entry
            .series
            .last()
            .map(|b| format!("{} close {:.2}", b.date, b.close))
            .unwrap_or_else(|| "empty".to_string());
        let trade = entry
            .trade
            .as_ref()
            .map(|t| {
                format!(
                    " | {:?} {} at {}",
                    t.last_action,
                    t.quantity,
                    t.last_action_at.format("%Y-%m-%d %H:%M")
                )
            })
            .unwrap_or_default();
        println!(
            "  {:<8} {:>4} bars, last {}{}",
            symbol,
            entry.series.len(),
            last,
            trade
        );
    }

    Ok(())
}

fn clear(cache: &CacheFile) -> Result<()> {
    // Refuse while a run holds the cache
    let _lock = cache.lock().context("Cache is in use")?;
    if cache.clear().context("Failed to clear cache")? {
        println!("Removed {}", cache.path().display());
    } else {
        println!("No cache file at {}", cache.path().display());
    }
    Ok(())
}
