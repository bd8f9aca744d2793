//! Metadata lookup adapter.
//!
//! The resolver owns the run-scoped cache and the call throttle and hides
//! the transport behind [`MetadataSource`]. Transport failures never reach
//! the caller; they become cached misses.

pub mod tmdb;

use serde::Serialize;
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::model::MediaType;

pub use tmdb::TmdbClient;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0} lookups are not supported")]
    Unsupported(MediaType),
}

/// Best result reported by the external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub year: Option<u16>,
    pub season_count: Option<u32>,
}

/// The external search capability. Potentially slow and fallible.
///
/// Implementations call [`Throttle::wait`] before every request they send,
/// so lookups that need several requests stay within the rate limit.
pub trait MetadataSource {
    fn search(
        &self,
        throttle: &mut Throttle,
        media_type: MediaType,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<SearchHit>, MetadataError>;
}

impl<S: MetadataSource + ?Sized> MetadataSource for Box<S> {
    fn search(
        &self,
        throttle: &mut Throttle,
        media_type: MediaType,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<SearchHit>, MetadataError> {
        (**self).search(throttle, media_type, title, year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataMatch {
    pub matched: bool,
    pub canonical_title: Option<String>,
    pub year: Option<u16>,
    pub season_count: Option<u32>,
}

impl MetadataMatch {
    pub fn miss() -> Self {
        Self {
            matched: false,
            canonical_title: None,
            year: None,
            season_count: None,
        }
    }

    /// Whether the lookup vouches for the title; consumed by `tmdb_match` rules.
    pub fn confidence_contribution(&self) -> bool {
        self.matched
    }
}

/// Lower-case alphanumerics, single spaced, without a leading "the".
pub fn normalize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let words = match words.split_first() {
        Some((first, rest)) if *first == "the" && !rest.is_empty() => rest,
        _ => &words[..],
    };
    words.join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    media_type: MediaType,
    title: String,
    year: Option<u16>,
}

impl CacheKey {
    pub fn new(media_type: MediaType, title: &str, year: Option<u16>) -> Self {
        Self {
            media_type,
            title: title.trim().to_lowercase(),
            year,
        }
    }
}

/// Enforces a minimum delay between successive external requests.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_call: Option<Instant>,
    requests: usize,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
            requests: 0,
        }
    }

    /// Requests let through so far.
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Sleep until `min_interval` has passed since the previous call, then
    /// record this one.
    pub fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let pause = self.min_interval - elapsed;
                trace!("Throttling metadata call for {:?}", pause);
                thread::sleep(pause);
            }
        }
        self.last_call = Some(Instant::now());
        self.requests += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub lookups: usize,
    pub cache_hits: usize,
    pub external_calls: usize,
    pub failures: usize,
}

pub struct MetadataResolver<S> {
    source: S,
    cache: HashMap<CacheKey, MetadataMatch>,
    throttle: Throttle,
    stats: ResolverStats,
}

impl<S: MetadataSource> MetadataResolver<S> {
    pub fn new(source: S, min_interval: Duration) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            throttle: Throttle::new(min_interval),
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// HTTP requests sent, which can exceed `external_calls` for tv lookups.
    pub fn requests_sent(&self) -> usize {
        self.throttle.requests()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn resolve(&mut self, media_type: MediaType, title: &str, year: Option<u16>) -> MetadataMatch {
        self.stats.lookups += 1;

        if !media_type.supports_lookup() || title.trim().is_empty() {
            return MetadataMatch::miss();
        }

        let key = CacheKey::new(media_type, title, year);
        if let Some(hit) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            trace!("Metadata cache hit for {:?}", key);
            return hit.clone();
        }

        self.stats.external_calls += 1;

        let outcome = match self.source.search(&mut self.throttle, media_type, title, year) {
            Ok(Some(hit)) => interpret(title, year, hit),
            Ok(None) => MetadataMatch::miss(),
            Err(e) => {
                self.stats.failures += 1;
                warn!("Metadata lookup for '{}' failed, continuing without it: {}", title, e);
                MetadataMatch::miss()
            }
        };

        debug!(
            "Metadata {} '{}' ({:?}): matched={}",
            media_type, title, year, outcome.matched
        );
        self.cache.insert(key, outcome.clone());
        outcome
    }
}

/// Accept the top result only when titles and (if both known) years agree.
fn interpret(query_title: &str, query_year: Option<u16>, hit: SearchHit) -> MetadataMatch {
    let titles_agree = normalize_title(query_title) == normalize_title(&hit.title);
    let years_agree = match (query_year, hit.year) {
        (Some(q), Some(h)) => q == h,
        _ => true,
    };

    if titles_agree && years_agree {
        MetadataMatch {
            matched: true,
            canonical_title: Some(hit.title),
            year: hit.year.or(query_year),
            season_count: hit.season_count,
        }
    } else {
        MetadataMatch::miss()
    }
}
