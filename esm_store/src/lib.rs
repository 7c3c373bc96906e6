//! Layered record store for game content files.
//!
//! Content files are applied in load order against a [`RecordStore`]; later
//! files override earlier ones per record id, deletions tombstone ids until a
//! later file brings them back, and dialogue topics accumulate their info
//! entries across every file that touches them. Once loading is done,
//! [`RecordStore::set_up`] derives the cross-collection indices and the store
//! is queried read-only.

pub mod collection;
pub mod dialogue;
pub mod error;
pub mod finalize;
pub mod id;
pub mod levelled;
pub mod records;
pub mod session;
pub mod store;

pub use collection::{RecordCollection, UpsertOutcome};
pub use dialogue::{Dialogue, DialogueInfo, DialogueMerger, DialogueType, InfoMerge, TopicCursor};
pub use error::{FormatError, LoadError, StoreError};
pub use finalize::{DanglingReference, StoreIndices};
pub use levelled::{resolve_levelled, CreatureLevList, ItemLevList, LevelItem, LevelledList};
pub use records::*;
pub use session::{FileLoadStats, LoadListener, LoadReport, LoadSession, NullListener};
pub use store::{KindSummary, RecordStore};
