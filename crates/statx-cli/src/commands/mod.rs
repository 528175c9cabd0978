//! CLI subcommands.

pub mod discover;
pub mod fetch;
pub mod fields;

use std::path::Path;

use statx_client::SchemaCache;

/// Load the cache file, degrading to an empty cache when the file is
/// missing or unreadable.
pub(crate) fn load_cache_or_empty(path: &Path) -> SchemaCache {
    if !path.exists() {
        return SchemaCache::new();
    }
    match SchemaCache::load(path) {
        Ok(cache) => cache,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "could not load schema cache, starting empty"
            );
            SchemaCache::new()
        }
    }
}
