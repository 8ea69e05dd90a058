//! Live viewer sessions grouped by the document they display.
//!
//! Broadcasts snapshot the recipients under the lock and deliver outside of
//! it, so a slow or dead session never blocks registration. Sessions whose
//! delivery fails are dropped afterwards.

use crate::path::{normalize, real_path};
use crate::search::{BackwardResult, ForwardResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type SessionId = u64;

/// Message pushed to a viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewerMessage {
    /// The document was rebuilt; reload it.
    Refresh,
    /// Scroll to the result of a forward search.
    Synctex { data: ForwardResult },
    /// Answer to a backward search requested by this viewer.
    Backward { data: BackwardResult },
    Error { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("session {0} is closed")]
    Closed(SessionId),

    #[error("session {0} is not keeping up with its messages")]
    Backlogged(SessionId),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One connected viewer.
pub trait Session: Send + Sync {
    fn id(&self) -> SessionId;

    /// Hand `message` to the viewer. Must not block.
    fn deliver(&self, message: &ViewerMessage) -> Result<(), DeliveryError>;
}

/// Identity of a document: its real path, or its normalized absolute path
/// when it does not exist (yet).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey(PathBuf);

impl DocumentKey {
    pub fn resolve(document: &Path) -> Self {
        match real_path(document) {
            Ok(path) => Self(path),
            Err(_) => {
                let absolute =
                    std::path::absolute(document).unwrap_or_else(|_| document.to_path_buf());
                Self(normalize(&absolute))
            }
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// The real path of a key that did not resolve when it was made, once the
    /// document exists.
    fn settled(&self) -> Option<Self> {
        real_path(&self.0).ok().filter(|real| *real != self.0).map(Self)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Document identity to sessions, with fan-out delivery.
pub struct SessionRegistry<S: Session> {
    sessions: Mutex<HashMap<DocumentKey, Vec<Arc<S>>>>,
}

impl<S: Session> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: Session> fmt::Debug for SessionRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("documents", &self.document_count())
            .field("sessions", &self.session_count())
            .finish()
    }
}

impl<S: Session> SessionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` for `document`, moving it away from any document it
    /// was registered for before.
    pub fn register(&self, session: Arc<S>, document: &Path) -> DocumentKey {
        let key = DocumentKey::resolve(document);
        let id = session.id();
        {
            let mut sessions = self.sessions.lock();
            remove_session(&mut sessions, id);
            sessions.entry(key.clone()).or_default().push(session);
        }
        tracing::debug!(session = id, document = %key, "Registered session");
        key
    }

    /// Remove a session from every document. Returns whether it was registered.
    pub fn unregister(&self, id: SessionId) -> bool {
        let removed = remove_session(&mut self.sessions.lock(), id);
        if removed {
            tracing::debug!(session = id, "Unregistered session");
        }
        removed
    }

    /// Ask the viewers of `document`, or of every document, to reload.
    ///
    /// Returns the number of successful deliveries.
    pub fn broadcast_refresh(&self, document: Option<&Path>) -> usize {
        let recipients = match document {
            Some(document) => self.recipients(&DocumentKey::resolve(document)),
            None => self.sessions.lock().values().flatten().cloned().collect(),
        };
        self.deliver_all(recipients, &ViewerMessage::Refresh)
    }

    /// Send a forward search result to the viewers of `document`.
    pub fn broadcast_search(&self, result: &ForwardResult, document: &Path) -> usize {
        let recipients = self.recipients(&DocumentKey::resolve(document));
        self.deliver_all(recipients, &ViewerMessage::Synctex { data: *result })
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().values().map(Vec::len).sum()
    }

    pub fn document_count(&self) -> usize {
        self.sessions.lock().len()
    }

    fn recipients(&self, key: &DocumentKey) -> Vec<Arc<S>> {
        self.settle();
        self.sessions.lock().get(key).cloned().unwrap_or_default()
    }

    /// Move sessions registered under a spelling that has since come to exist
    /// to the document's real path. Resolution happens outside the lock.
    fn settle(&self) {
        let keys: Vec<DocumentKey> = self.sessions.lock().keys().cloned().collect();
        let moved: Vec<_> = keys
            .into_iter()
            .filter_map(|key| key.settled().map(|real| (key, real)))
            .collect();
        if moved.is_empty() {
            return;
        }

        let mut sessions = self.sessions.lock();
        for (old, real) in moved {
            if let Some(list) = sessions.remove(&old) {
                tracing::debug!(from = %old, to = %real, "Document now exists, re-keying sessions");
                sessions.entry(real).or_default().extend(list);
            }
        }
    }

    fn deliver_all(&self, recipients: Vec<Arc<S>>, message: &ViewerMessage) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();
        for session in recipients {
            match session.deliver(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(session = session.id(), "Dropping session: {}", e);
                    failed.push(session.id());
                }
            }
        }

        if !failed.is_empty() {
            let mut sessions = self.sessions.lock();
            for id in failed {
                remove_session(&mut sessions, id);
            }
        }
        delivered
    }
}

fn remove_session<S: Session>(sessions: &mut HashMap<DocumentKey, Vec<Arc<S>>>, id: SessionId) -> bool {
    let mut removed = false;
    sessions.retain(|_, list| {
        let before = list.len();
        list.retain(|s| s.id() != id);
        removed |= list.len() != before;
        !list.is_empty()
    });
    removed
}
