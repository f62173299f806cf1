//! Instrument universe sources and the symbol denylist.

use async_trait::async_trait;
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use trading_core::error::DataError;
use trading_core::traits::UniverseSource;

/// Fixed list of symbols from configuration or the command line.
pub struct StaticUniverse {
    symbols: Vec<String>,
}

impl StaticUniverse {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl UniverseSource for StaticUniverse {
    async fn symbols(&self) -> Result<Vec<String>, DataError> {
        Ok(self.symbols.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Symbols read from a local file: a CSV with a `Symbol`/`Ticker` column, or
/// one symbol per line.
pub struct FileUniverse {
    path: PathBuf,
}

impl FileUniverse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UniverseSource for FileUniverse {
    async fn symbols(&self) -> Result<Vec<String>, DataError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DataError::Internal(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        parse_symbol_list(&text)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Symbols from a remote CSV document (e.g. index constituents).
pub struct HttpCsvUniverse {
    client: reqwest::Client,
    url: String,
}

impl HttpCsvUniverse {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl UniverseSource for HttpCsvUniverse {
    async fn symbols(&self) -> Result<Vec<String>, DataError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DataError::ConnectionError(format!(
                "HTTP {} from {}",
                resp.status(),
                self.url
            )));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;
        let symbols = parse_symbol_list(&text)?;
        debug!(url = %self.url, count = symbols.len(), "Fetched universe");
        Ok(symbols)
    }

    fn name(&self) -> &str {
        "url"
    }
}

/// Parse a symbol list: CSV with a header naming a `symbol` or `ticker`
/// column (case-insensitive), otherwise one symbol per line.
pub fn parse_symbol_list(text: &str) -> Result<Vec<String>, DataError> {
    let first_line = text.lines().next().unwrap_or_default();
    if !first_line.contains(',') {
        return Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseError(e.to_string()))?
        .clone();
    let column = headers
        .iter()
        .position(|h| {
            let h = h.trim();
            h.eq_ignore_ascii_case("symbol") || h.eq_ignore_ascii_case("ticker")
        })
        .ok_or_else(|| DataError::ParseError("no Symbol or Ticker column".into()))?;

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataError::ParseError(e.to_string()))?;
        if let Some(symbol) = record.get(column) {
            symbols.push(symbol.to_string());
        }
    }
    Ok(symbols)
}

/// Drops symbols known to break downstream parsing (multi-class tickers)
/// along with blanks and duplicates. Order is preserved.
#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    excluded_prefixes: Vec<String>,
}

impl SymbolFilter {
    pub fn new<I, S>(excluded_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_prefixes: excluded_prefixes
                .into_iter()
                .map(|p| p.into().to_uppercase())
                .collect(),
        }
    }

    pub fn is_excluded(&self, symbol: &str) -> bool {
        let upper = symbol.to_uppercase();
        self.excluded_prefixes.iter().any(|p| upper.starts_with(p.as_str()))
    }

    pub fn apply(&self, symbols: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        symbols
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .filter(|s| {
                let excluded = self.is_excluded(s);
                if excluded {
                    debug!(symbol = %s, "Excluded by denylist");
                }
                !excluded
            })
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }
}
