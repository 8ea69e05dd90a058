//! Parsed index cache validated against the mapping files' modification times.
//!
//! Requests for one document that arrive while its mapping file is being
//! parsed await the same parse through a shared future.

use crate::error::{Result, SyncError};
use crate::registry::DocumentKey;
use crate::synctex::{DocumentIndex, MappingLocation, MappingStamp, load_mapping};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Number of parsed indices kept when no capacity is configured.
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(16).unwrap();

type SharedParse = Shared<BoxFuture<'static, Result<Arc<DocumentIndex>>>>;

type Flight = (DocumentKey, MappingStamp);

/// Parses in progress. Entries are removed by the parse task itself, so a
/// parse whose every awaiter went away does not linger.
type InFlight = Arc<parking_lot::Mutex<HashMap<Flight, SharedParse>>>;

/// An index together with the mapping file state it was parsed from.
struct CachedIndex {
    stamp: MappingStamp,
    index: Arc<DocumentIndex>,
}

/// LRU cache of parsed indices, keyed by document identity.
pub struct IndexCache {
    entries: Mutex<LruCache<DocumentKey, CachedIndex>>,
    in_flight: InFlight,
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("capacity", &self.entries.try_lock().map(|c| c.cap()).ok())
            .field("in_flight", &self.in_flight.lock().len())
            .finish_non_exhaustive()
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl IndexCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Arc::default(),
        }
    }

    /// Index of `document`, parsing its mapping file if the cached copy is stale.
    ///
    /// 1. Stamps both candidate mapping files as they are on disk
    /// 2. Serves the cached index if it was parsed from that stamp
    /// 3. Otherwise awaits an in-flight parse of that stamp or starts one
    pub async fn get(&self, document: &Path) -> Result<Arc<DocumentIndex>> {
        let key = DocumentKey::resolve(document);
        let location = MappingLocation::for_document(document);

        let Some(stamp) = location.stamp() else {
            self.entries.lock().await.pop(&key);
            tracing::debug!("No mapping file for {}", document.display());
            return Err(SyncError::MissingMappingFile {
                plain: location.plain,
                compressed: location.compressed,
            });
        };

        {
            let mut entries = self.entries.lock().await;
            if let Some(cached) = entries.get(&key) {
                if cached.stamp == stamp {
                    tracing::debug!("Cache hit for {}", document.display());
                    return Ok(Arc::clone(&cached.index));
                }
                tracing::debug!("Mapping files of {} changed, reparsing", document.display());
            }
        }

        let parse = {
            let mut in_flight = self.in_flight.lock();
            let flight = (key.clone(), stamp);
            if let Some(parse) = in_flight.get(&flight) {
                tracing::debug!("Awaiting in-flight parse for {}", document.display());
                parse.clone()
            } else {
                let parse = spawn_parse(document, flight.clone(), Arc::clone(&self.in_flight));
                in_flight.insert(flight, parse.clone());
                parse
            }
        };

        let result = parse.await;
        if let Ok(index) = &result {
            self.entries.lock().await.put(
                key,
                CachedIndex {
                    stamp,
                    index: Arc::clone(index),
                },
            );
        }
        result
    }

    /// Drop the cached index of `document`, if any.
    pub async fn invalidate(&self, document: &Path) {
        let key = DocumentKey::resolve(document);
        if self.entries.lock().await.pop(&key).is_some() {
            tracing::debug!("Invalidated cached index for {}", document.display());
        }
    }

    /// Number of cached indices.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Parse on the blocking pool from a detached task; the returned future can be
/// awaited many times, or not at all.
///
/// The caller must insert the result into `in_flight` while still holding its
/// lock, so the task's own removal always comes after the insertion.
fn spawn_parse(document: &Path, flight: Flight, in_flight: InFlight) -> SharedParse {
    let document = document.to_path_buf();
    let task = tokio::spawn(async move {
        tracing::info!("Parsing mapping file for {}", document.display());
        let result = tokio::task::spawn_blocking(move || load_mapping(&document))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))
            .and_then(|loaded| loaded.map(Arc::new));
        in_flight.lock().remove(&flight);
        result
    });
    let parse: BoxFuture<'static, Result<Arc<DocumentIndex>>> = Box::pin(async move {
        task.await.map_err(|e| SyncError::Task(e.to_string()))?
    });
    parse.shared()
}
