//! CRDT-backed document using Loro.
//!
//! # Schema
//!
//! ```text
//! LoroDoc
//! ├── "lines": LoroMap<LineId, LoroMap>         (id, x1, y1, x2, y2)
//! ├── "line_order": LoroList<String>            (line ids, append order)
//! ├── "relations": LoroMap<RelationId, LoroMap> (id, members: LoroList<String>)
//! └── "relation_order": LoroList<String>        (relation ids, append order)
//! ```
//!
//! Two peers appending lines at the same moment each relate their new
//! line only to the lines they had already seen, so that pair ends up
//! without a relation.

mod convert;
mod schema;

pub use schema::{CrdtDocument, LINES_KEY, LINE_ORDER_KEY, RELATIONS_KEY, RELATION_ORDER_KEY};

pub use loro::VersionVector;
