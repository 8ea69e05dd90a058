//! Search entry points that obtain the index of a document on demand.

use crate::cache::IndexCache;
use crate::error::Result;
use crate::search::{self, BackwardResult, ForwardResult};
use std::num::NonZeroUsize;
use std::path::Path;

/// Runs forward and backward searches against cached document indices.
#[derive(Debug, Default)]
pub struct SyncService {
    cache: IndexCache,
}

impl SyncService {
    pub fn new(cache_capacity: NonZeroUsize) -> Self {
        Self {
            cache: IndexCache::new(cache_capacity),
        }
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Page position of `line` in `source`, within the compiled `document`.
    pub async fn forward(&self, line: u32, source: &Path, document: &Path) -> Result<ForwardResult> {
        let index = self.cache.get(document).await?;
        let result = search::forward(&index, line, source, document_dir(document))?;
        tracing::info!(
            "Forward search {}:{} -> page {} ({:.2}, {:.2})",
            source.display(),
            line,
            result.page,
            result.x,
            result.y
        );
        Ok(result)
    }

    /// Source line under `(x, y)` on `page` of `document`.
    pub async fn backward(&self, page: u32, x: f64, y: f64, document: &Path) -> Result<BackwardResult> {
        let index = self.cache.get(document).await?;
        let result = search::backward(&index, page, x, y, document_dir(document))?;
        tracing::info!(
            "Backward search page {} ({:.2}, {:.2}) -> {}:{}",
            page,
            x,
            y,
            result.input.display(),
            result.line
        );
        Ok(result)
    }
}

fn document_dir(document: &Path) -> Option<&Path> {
    document.parent().filter(|dir| !dir.as_os_str().is_empty())
}
