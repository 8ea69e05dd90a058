//! SyncTeX position-mapping files: data model, decoder and file lookup.

pub mod index;
pub mod locate;
pub mod parser;

pub use index::{
    Block, BlockKind, DocumentIndex, DocumentIndexBuilder, InputName, LineMap, Offset, PageBlocks,
};
pub use locate::{MappingLocation, MappingStamp, load_mapping};
