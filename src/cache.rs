//! Memoized template compilation.

use std::sync::Arc;

use ivy_compiler::{CompileOptions, IvyError, Template};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};
use xxhash_rust::xxh64::xxh64;

use crate::compile_template_with;

/// Caches compiled templates by source text.
///
/// Entries are keyed by the xxh64 hash of the source; a hit is confirmed
/// against the stored source before it is returned. Failed compiles are not
/// cached.
///
/// ```
/// use ivy::TemplateCache;
///
/// let mut cache = TemplateCache::new();
/// let source = "contract TrivialLock(locked: Value) { clause unlock() { return locked } }";
/// let first = cache.get_or_compile(source).unwrap();
/// let second = cache.get_or_compile(source).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
#[derive(Debug, Default)]
pub struct TemplateCache {
    options: CompileOptions,
    entries: FxHashMap<u64, Vec<Arc<Template>>>,
    hits: usize,
    misses: usize,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that compiles with `options`.
    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// The cached template for `source`, compiling it on a miss.
    pub fn get_or_compile(&mut self, source: &str) -> Result<Arc<Template>, IvyError> {
        let key = xxh64(source.as_bytes(), 0);

        if let Some(template) = self
            .entries
            .get(&key)
            .and_then(|bucket| bucket.iter().find(|t| t.source == source))
        {
            self.hits += 1;
            trace!(target: "ivy::cache", key, "template cache hit");
            return Ok(Arc::clone(template));
        }

        self.misses += 1;
        let template = Arc::new(compile_template_with(source, &self.options)?);
        debug!(
            target: "ivy::cache",
            key,
            contract = %template.name,
            "template cached"
        );
        self.entries
            .entry(key)
            .or_default()
            .push(Arc::clone(&template));
        Ok(template)
    }

    /// Whether `source` has a cached template.
    pub fn contains(&self, source: &str) -> bool {
        self.entries
            .get(&xxh64(source.as_bytes(), 0))
            .is_some_and(|bucket| bucket.iter().any(|t| t.source == source))
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIVIAL: &str = "contract TrivialLock(locked: Value) {
        clause unlock() { return locked }
    }";

    #[test]
    fn second_lookup_hits() {
        let mut cache = TemplateCache::new();
        cache.get_or_compile(TRIVIAL).unwrap();
        cache.get_or_compile(TRIVIAL).unwrap();
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(TRIVIAL));
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = TemplateCache::new();
        assert!(cache.get_or_compile("contract Broken(").is_err());
        assert!(cache.is_empty());
        assert!(!cache.contains("contract Broken("));
    }

    #[test]
    fn options_apply_to_cached_templates() {
        let mut cache = TemplateCache::with_options(CompileOptions::new().with_optimize(false));
        let template = cache.get_or_compile(TRIVIAL).unwrap();
        assert_eq!(template.instructions_text(), "TRUE");
        cache.clear();
        assert!(cache.is_empty());
    }
}
