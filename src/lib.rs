pub mod cache;
pub mod cli;
pub mod config;
pub mod encoding;
pub mod error;
pub mod path;
pub mod registry;
pub mod search;
pub mod server;
pub mod service;
pub mod synctex;
pub mod tracing;

pub use error::{ParseError, Result, SyncError};
pub use registry::{DocumentKey, Session, SessionRegistry, ViewerMessage};
pub use search::{BackwardResult, ForwardResult};
pub use service::SyncService;
pub use synctex::{DocumentIndex, load_mapping};
