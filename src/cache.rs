//! Thread-local compilation cache for regex patterns.
//!
//! Caches compiled regexes to avoid redundant recompilation when the same
//! pattern is resolved repeatedly (multi-edit sessions re-match every edit
//! against the current document state, so anchor patterns recur often).
//! Cache is capped at 256 entries; it is cleared wholesale when full.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static PATTERN_CACHE: RefCell<HashMap<String, Regex>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled pattern from cache, or compile and cache it.
///
/// `Regex` is internally reference-counted, so the returned clone is cheap.
/// Compilation failures are returned to the caller and never cached.
pub fn get_or_compile(pattern_str: &str) -> Result<Regex, regex::Error> {
    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern_str) {
            return Ok(re.clone());
        }

        // Evict all if at capacity (simple but effective for batch workloads)
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Regex::new(pattern_str)?;
        cache.insert(pattern_str.to_string(), compiled.clone());
        Ok(compiled)
    })
}

/// Clear the pattern cache (mainly for testing).
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

/// Get cache statistics for monitoring.
pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}
