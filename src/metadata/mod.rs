//! Self-describing hierarchical parameter store.
//!
//! # Architecture
//!
//! ```text
//! MetaData "ROOT"
//!   ├── MetaData "POINT"           (group: no payload)
//!   │     ├── MetaData "USED"      (MetaDataInfo Integer [])
//!   │     ├── MetaData "LABELS"    (MetaDataInfo Char [len, n])
//!   │     └── MetaData "LABELS2"   (continuation past 255 rows)
//!   └── MetaData "ANALOG"
//! ```
//!
//! - [`info`] holds the typed, dimensioned payload.
//! - [`tree`] holds the labelled nodes and their ordered children.
//! - [`utils`] splits long value lists across numbered children and collapses
//!   them back.

pub mod info;
pub mod tree;
pub mod utils;

pub use info::{element_count, MetaDataFormat, MetaDataInfo, MetaDataValues};
pub use tree::{MetaData, ROOT_LABEL};
pub use utils::{
    collapse_child_doubles, collapse_child_values, create_child, create_child_info,
    create_child_values,
};
