use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, HeaderMap, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CACHE_VERSION: u32 = 2;
const CACHE_DIR: &str = "simple_fantasy";
const CACHE_FILE: &str = "http_cache.json";
/// Entries untouched for this long are dropped on the next write.
const EVICT_AFTER_SECS: u64 = 7 * 24 * 60 * 60;

static CACHE: Mutex<Option<HttpCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always hit the network and never store the body.
    Bypass,
    /// Serve a stored body younger than `max_age_secs`; otherwise revalidate.
    Revalidate { max_age_secs: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

impl HttpCacheFile {
    fn evict_older_than(&mut self, now: u64, max_idle: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.fetched_at) < max_idle);
        before - self.entries.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

impl CacheEntry {
    fn from_response(body: String, headers: &HeaderMap, now: u64) -> Self {
        let header = |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        CacheEntry {
            body,
            etag: header(ETAG),
            last_modified: header(LAST_MODIFIED),
            fetched_at: now,
        }
    }

    fn is_fresh(&self, now: u64, max_age_secs: u64) -> bool {
        now.saturating_sub(self.fetched_at) < max_age_secs
    }
}

/// GETs `url`, answering from the on-disk cache when `policy` allows.
pub fn fetch_json(client: &Client, url: &str, policy: CachePolicy) -> Result<String> {
    let max_age = match policy {
        CachePolicy::Bypass => return fetch_uncached(client, url),
        CachePolicy::Revalidate { max_age_secs } => max_age_secs,
    };

    let cached_entry = {
        let mut guard = CACHE.lock().unwrap_or_else(|e| e.into_inner());
        let cache = guard.get_or_insert_with(load_default_cache);
        cache.entries.get(url).cloned()
    };

    let now = now_secs();
    if let Some(entry) = cached_entry.as_ref()
        && entry.is_fresh(now, max_age)
    {
        debug!(url, age = now.saturating_sub(entry.fetched_at), "http cache fresh");
        return Ok(entry.body.clone());
    }

    let mut req = client.get(url);
    if let Some(entry) = cached_entry.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().with_context(|| format!("request {url} failed"))?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        let Some(mut entry) = cached_entry else {
            return Err(anyhow!("{url}: received 304 without a cached body"));
        };
        debug!(url, "http cache revalidated");
        entry.fetched_at = now;
        let body = entry.body.clone();
        store_entry(url, entry, now);
        return Ok(body);
    }

    let headers = resp.headers().clone();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("{url}: http {status}: {body}"));
    }
    store_entry(url, CacheEntry::from_response(body.clone(), &headers, now), now);
    Ok(body)
}

fn fetch_uncached(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("request {url} failed"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("{url}: http {status}: {body}"));
    }
    Ok(body)
}

fn store_entry(url: &str, entry: CacheEntry, now: u64) {
    let mut guard = CACHE.lock().unwrap_or_else(|e| e.into_inner());
    let cache = guard.get_or_insert_with(load_default_cache);
    cache.version = CACHE_VERSION;
    cache.entries.insert(url.to_string(), entry);
    let evicted = cache.evict_older_than(now, EVICT_AFTER_SECS);
    if evicted > 0 {
        debug!(evicted, "http cache entries evicted");
    }
    let Some(path) = cache_path() else {
        return;
    };
    if let Err(err) = save_cache_file(&path, cache) {
        warn!(path = %path.display(), error = %err, "http cache not saved");
    }
}

fn load_default_cache() -> HttpCacheFile {
    cache_path()
        .map(|path| load_cache_file(&path))
        .unwrap_or_default()
}

// Unreadable, corrupt or outdated files all start an empty cache.
fn load_cache_file(path: &Path) -> HttpCacheFile {
    let Ok(raw) = fs::read_to_string(path) else {
        return HttpCacheFile::default();
    };
    match serde_json::from_str::<HttpCacheFile>(&raw) {
        Ok(cache) if cache.version == CACHE_VERSION => cache,
        _ => HttpCacheFile::default(),
    }
}

fn save_cache_file(path: &Path, cache: &HttpCacheFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, path).context("swap http cache")?;
    Ok(())
}

/// `$XDG_CACHE_HOME/simple_fantasy`, else `~/.cache/simple_fantasy`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn entry(fetched_at: u64) -> CacheEntry {
        CacheEntry {
            body: "{}".to_string(),
            etag: Some("\"abc\"".to_string()),
            last_modified: None,
            fetched_at,
        }
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("simple_fantasy_cache_{}_{name}", std::process::id()))
            .join(CACHE_FILE)
    }

    #[test]
    fn freshness_is_strictly_younger_than_max_age() {
        let e = entry(1_000);
        assert!(e.is_fresh(1_299, 300));
        assert!(!e.is_fresh(1_300, 300));
        assert!(!e.is_fresh(1_000, 0), "zero max age always revalidates");
    }

    #[test]
    fn entry_keeps_validators_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"v1\""));
        headers.insert(LAST_MODIFIED, HeaderValue::from_static("Sat, 30 Aug 2025 10:00:00 GMT"));
        let e = CacheEntry::from_response("[]".to_string(), &headers, 42);
        assert_eq!(e.etag.as_deref(), Some("\"v1\""));
        assert!(e.last_modified.is_some());
        assert_eq!(e.fetched_at, 42);
    }

    #[test]
    fn eviction_drops_idle_entries_only() {
        let mut cache = HttpCacheFile::default();
        cache.entries.insert("old".to_string(), entry(0));
        cache.entries.insert("new".to_string(), entry(EVICT_AFTER_SECS));
        assert_eq!(cache.evict_older_than(EVICT_AFTER_SECS + 1, EVICT_AFTER_SECS), 1);
        assert!(cache.entries.contains_key("new"));
    }

    #[test]
    fn saved_cache_loads_back_and_rejects_old_versions() {
        let path = scratch_path("roundtrip");
        let mut cache = HttpCacheFile {
            version: CACHE_VERSION,
            entries: HashMap::new(),
        };
        cache.entries.insert("https://x/fixtures/".to_string(), entry(7));
        save_cache_file(&path, &cache).unwrap();
        assert_eq!(load_cache_file(&path), cache);

        cache.version = CACHE_VERSION - 1;
        save_cache_file(&path, &cache).unwrap();
        assert!(load_cache_file(&path).entries.is_empty());

        fs::write(&path, "not json").unwrap();
        assert!(load_cache_file(&path).entries.is_empty());
        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).ok();
        }
    }
}
