//! Process-wide caches for hot parsing paths.
//!
//! Path strings repeat heavily when a caller edits many documents with the
//! same shape, so parsed steps are memoized behind a mutex. Render buffers
//! are pooled the same way to avoid reallocating a large `String` for every
//! serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use super::error::Error;
use super::path::{parse_path, Step};

/// Entries kept before the path cache stops growing.
const PATH_CACHE_CAP: usize = 1024;

/// Buffers kept around for reuse between renders.
const BUFFER_POOL_CAP: usize = 8;

fn path_cache() -> &'static Mutex<HashMap<String, Arc<Vec<Step>>>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Arc<Vec<Step>>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Parse a path, consulting the process-wide cache first.
///
/// Only well-formed paths are cached; malformed ones re-parse (and re-fail)
/// every time, which keeps error construction out of the cache.
pub fn parsed_steps(path: &str) -> Result<Arc<Vec<Step>>, Error> {
    if let Ok(cache) = path_cache().lock() {
        if let Some(steps) = cache.get(path) {
            log::trace!("path cache hit: '{}'", path);
            return Ok(Arc::clone(steps));
        }
    }

    let steps = Arc::new(parse_path(path)?);
    if let Ok(mut cache) = path_cache().lock() {
        if cache.len() < PATH_CACHE_CAP {
            cache.insert(path.to_string(), Arc::clone(&steps));
        }
    }
    Ok(steps)
}

fn buffer_pool() -> &'static Mutex<Vec<String>> {
    static POOL: OnceLock<Mutex<Vec<String>>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(Vec::new()))
}

/// Take a cleared buffer from the pool, or allocate a fresh one.
pub fn take_buffer(capacity_hint: usize) -> String {
    if let Ok(mut pool) = buffer_pool().lock() {
        if let Some(mut buf) = pool.pop() {
            buf.clear();
            return buf;
        }
    }
    String::with_capacity(capacity_hint)
}

/// Return a buffer to the pool for reuse.
pub fn put_buffer(buf: String) {
    if let Ok(mut pool) = buffer_pool().lock() {
        if pool.len() < BUFFER_POOL_CAP {
            pool.push(buf);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
