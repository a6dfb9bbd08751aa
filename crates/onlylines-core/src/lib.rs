//! OnlyLines Core Library
//!
//! Collaborative canvas of infinite lines. Every pair of lines is related
//! in a shared document, and the view engine derives the clipped line
//! segments and intersection points a renderer draws.

pub mod crdt;
pub mod document;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod ids;
pub mod input;
pub mod relation;
pub mod session;
pub mod subscription;
pub mod view;

pub use crdt::CrdtDocument;
pub use document::{Document, DocumentSnapshot, LineRecord, MemoryDocument, RelationRecord};
pub use error::{DocumentError, Error, StateConsistencyError, ValidationError};
pub use geometry::{Bounds, Line, Primitive, PrimitiveKind};
pub use gesture::{DragMode, GestureAction, GestureConfig, GestureState};
pub use ids::{IdGenerator, LineId, RelationId, SequentialIds, UuidGenerator};
pub use input::PointerEvent;
pub use relation::{IntersectionPoint, Relation};
pub use session::Session;
pub use view::{LineSegment, ViewState, ViewStateEngine};
