//! The replicated document boundary.
//!
//! The core only ever sees whole snapshots of two append/update-only
//! arrays, and mutates them through the narrow [`Document`] trait.
//! Merge semantics belong to the implementation (see [`crate::crdt`]).
//!
//! Wire shape of a snapshot:
//! ```text
//! { "lines":     [[id, [x1, y1], [x2, y2]], ...],
//!   "relations": [[id, [line_a, line_b]], ...] }
//! ```

mod memory;

pub use memory::MemoryDocument;

use crate::error::{DocumentResult, ValidationError};
use crate::geometry::Line;
use crate::ids::{IdGenerator, LineId, RelationId};
use crate::subscription::{Callback, SubscriptionId};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A line as stored in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LineRepr", into = "LineRepr")]
pub struct LineRecord {
    pub id: LineId,
    pub start: Point,
    pub end: Point,
}

#[derive(Serialize, Deserialize)]
struct LineRepr(LineId, [f64; 2], [f64; 2]);

impl From<LineRepr> for LineRecord {
    fn from(LineRepr(id, [x1, y1], [x2, y2]): LineRepr) -> Self {
        Self {
            id,
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
        }
    }
}

impl From<LineRecord> for LineRepr {
    fn from(record: LineRecord) -> Self {
        LineRepr(
            record.id,
            [record.start.x, record.start.y],
            [record.end.x, record.end.y],
        )
    }
}

impl LineRecord {
    pub fn new(id: LineId, start: Point, end: Point) -> Self {
        Self { id, start, end }
    }

    /// Build the geometric line, validating the coordinates.
    pub fn to_line(&self) -> Result<Line, ValidationError> {
        Line::new(self.id.clone(), self.start, self.end)
    }
}

impl From<&Line> for LineRecord {
    fn from(line: &Line) -> Self {
        Self::new(line.id().clone(), line.start(), line.end())
    }
}

/// A relation as stored in the document. Membership never changes after
/// the record is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RelationRepr", into = "RelationRepr")]
pub struct RelationRecord {
    pub id: RelationId,
    pub members: Vec<LineId>,
}

#[derive(Serialize, Deserialize)]
struct RelationRepr(RelationId, Vec<LineId>);

impl From<RelationRepr> for RelationRecord {
    fn from(RelationRepr(id, members): RelationRepr) -> Self {
        Self { id, members }
    }
}

impl From<RelationRecord> for RelationRepr {
    fn from(record: RelationRecord) -> Self {
        RelationRepr(record.id, record.members)
    }
}

impl RelationRecord {
    pub fn new(id: RelationId, a: LineId, b: LineId) -> Self {
        Self {
            id,
            members: vec![a, b],
        }
    }
}

/// Full contents of the document at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub lines: Vec<LineRecord>,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
}

impl DocumentSnapshot {
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn line(&self, id: &LineId) -> Option<&LineRecord> {
        self.lines.iter().find(|l| &l.id == id)
    }
}

/// Capability interface over a (possibly replicated) document.
///
/// Subscribers fire synchronously, in subscription order, after every
/// successful change, local or merged from a peer.
pub trait Document {
    fn snapshot(&self) -> DocumentSnapshot;

    /// Append a new line together with its relations, as one change.
    fn append_line(&mut self, line: LineRecord, relations: Vec<RelationRecord>) -> DocumentResult<()>;

    /// Overwrite the coordinates of an existing line.
    fn update_line(&mut self, id: &LineId, start: Point, end: Point) -> DocumentResult<()>;

    fn subscribe(&mut self, callback: Callback<DocumentSnapshot>) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// One relation between `new_line` and each of `existing`.
pub fn relations_for_new_line<'a>(
    new_line: &LineId,
    existing: impl IntoIterator<Item = &'a LineId>,
    ids: &mut dyn IdGenerator,
) -> Vec<RelationRecord> {
    existing
        .into_iter()
        .filter(|id| *id != new_line)
        .map(|id| RelationRecord::new(ids.next_relation_id(), id.clone(), new_line.clone()))
        .collect()
}

/// Append `line` to `document` with a relation to every line already in it.
pub fn append_line_with_relations<D: Document + ?Sized>(
    document: &mut D,
    line: LineRecord,
    ids: &mut dyn IdGenerator,
) -> DocumentResult<()> {
    let snapshot = document.snapshot();
    let relations = relations_for_new_line(&line.id, snapshot.lines.iter().map(|l| &l.id), ids);
    log::debug!(
        "Appending line {} with {} relations",
        line.id,
        relations.len()
    );
    document.append_line(line, relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use std::collections::HashSet;

    #[test]
    fn test_snapshot_wire_shape() {
        let snapshot = DocumentSnapshot {
            lines: vec![LineRecord::new(
                LineId::new("a"),
                Point::new(0.0, 1.0),
                Point::new(2.0, 3.5),
            )],
            relations: vec![RelationRecord::new(
                RelationId::new("r"),
                LineId::new("a"),
                LineId::new("b"),
            )],
        };
        let json = snapshot.to_json();
        assert_eq!(
            json,
            r#"{"lines":[["a",[0.0,1.0],[2.0,3.5]]],"relations":[["r",["a","b"]]]}"#
        );
        assert_eq!(DocumentSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_malformed_snapshot() {
        let err = DocumentSnapshot::from_json(r#"{"lines":[["a",["x",1],[2,3]]]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_missing_arrays_default_to_empty() {
        let snapshot = DocumentSnapshot::from_json("{}").unwrap();
        assert!(snapshot.lines.is_empty());
        assert!(snapshot.relations.is_empty());
    }

    #[test]
    fn test_relations_for_new_line() {
        let mut ids = SequentialIds::new("r");
        let existing: Vec<LineId> = ["a", "b", "c"].into_iter().map(LineId::from).collect();
        let new = LineId::new("d");
        let relations = relations_for_new_line(&new, &existing, &mut ids);

        assert_eq!(relations.len(), 3);
        let mut seen = HashSet::new();
        for r in &relations {
            assert_eq!(r.members.len(), 2);
            assert_eq!(r.members[1], new);
            assert_ne!(r.members[0], new);
            assert!(seen.insert(r.members[0].clone()));
        }
    }

    #[test]
    fn test_nth_line_creates_n_minus_one_relations() {
        let mut doc = MemoryDocument::new();
        let mut ids = SequentialIds::new("id");
        for n in 1..=5 {
            let before = doc.snapshot().relations.len();
            let line = LineRecord::new(ids.next_line_id(), Point::new(n as f64, 0.0), Point::new(0.0, n as f64));
            append_line_with_relations(&mut doc, line, &mut ids).unwrap();
            let after = doc.snapshot().relations.len();
            assert_eq!(after - before, n - 1);
        }

        let snapshot = doc.snapshot();
        let mut pairs = HashSet::new();
        for r in &snapshot.relations {
            assert_ne!(r.members[0], r.members[1]);
            let mut pair = r.members.clone();
            pair.sort();
            assert!(pairs.insert(pair), "duplicate relation");
        }
        assert_eq!(pairs.len(), 10);
    }
}
