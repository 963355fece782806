// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shared parse cache
//!
//! Constraint expressions are evaluated once per matching node, so the same
//! handful of strings is parsed over and over during a validation run. The
//! cache keeps one `Arc<ExpressionNode>` per distinct expression text and is
//! safe to share between threads.

use dashmap::DashMap;
use octofhir_fhirpath_ast::ExpressionNode;
use octofhir_fhirpath_core::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Parsed expression shared between evaluations
pub type SharedAst = Arc<ExpressionNode>;

/// Cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries currently cached
    pub entries: usize,
    /// Number of entries evicted to stay under `max_entries`
    pub evictions: u64,
}

impl ParseCacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            (self.hits as f64) / ((self.hits + self.misses) as f64) * 100.0
        }
    }
}

/// Configuration for the parse cache
#[derive(Debug, Clone)]
pub struct ParseCacheConfig {
    /// Maximum number of entries to cache
    pub max_entries: usize,
    /// Whether the cache is enabled
    pub enabled: bool,
}

impl Default for ParseCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            enabled: true,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    ast: SharedAst,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(ast: SharedAst) -> Self {
        Self {
            ast,
            last_accessed: Instant::now(),
        }
    }

    fn access(&mut self) -> SharedAst {
        self.last_accessed = Instant::now();
        Arc::clone(&self.ast)
    }
}

/// Thread-safe parse cache with least-recently-used eviction
#[derive(Debug)]
pub struct ParseCache {
    cache: DashMap<String, CacheEntry>,
    config: ParseCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseCache {
    /// Create a cache with default configuration
    pub fn new() -> Self {
        Self::with_config(ParseCacheConfig::default())
    }

    /// Create a cache with custom configuration
    pub fn with_config(config: ParseCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the cached AST for `expression`, parsing it on a miss
    ///
    /// Syntax errors are not cached; they are reported on every call.
    pub fn get_or_parse(&self, expression: &str) -> Result<SharedAst> {
        if !self.config.enabled {
            return crate::parse(expression).map(Arc::new);
        }

        if let Some(mut entry) = self.cache.get_mut(expression) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.access());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::trace!("parse cache miss for '{expression}'");
        let ast = Arc::new(crate::parse(expression)?);

        if self.cache.len() >= self.config.max_entries {
            self.evict_lru_entries();
        }
        self.cache
            .insert(expression.to_string(), CacheEntry::new(Arc::clone(&ast)));
        Ok(ast)
    }

    /// Get cache statistics
    pub fn stats(&self) -> ParseCacheStats {
        ParseCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Drop the oldest tenth of the entries (at least one)
    fn evict_lru_entries(&self) {
        let target = (self.config.max_entries / 10).max(1);

        let mut by_age: Vec<(String, Instant)> = self
            .cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_accessed))
            .collect();
        by_age.sort_by_key(|(_, accessed)| *accessed);

        let mut evicted = 0u64;
        for (key, _) in by_age.into_iter().take(target) {
            if self.cache.remove(&key).is_some() {
                evicted += 1;
            }
        }
        self.evictions.fetch_add(evicted, Ordering::Relaxed);
        log::debug!("parse cache evicted {evicted} entries");
    }
}
