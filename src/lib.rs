//! Hierarchical outliner core: a status-bearing item forest, the structural
//! editing engine that drives it, and debounced JSON persistence.
//!
//! The crate is presentation-agnostic. A front end feeds user intents into
//! [`engine::Outliner`], re-renders from its flattened view, and polls
//! [`engine::Outliner::tick`] to drive saves.

pub mod engine;
pub mod io;
pub mod model;

pub use engine::{FlatItem, Outliner, flatten};
pub use io::{ForestStore, JsonFileStore, SaveDebouncer, StoreError};
pub use model::{
    Forest, HierarchyError, Item, ItemId, Status, StatusCategory, StatusConfig, TaskCounts,
};
