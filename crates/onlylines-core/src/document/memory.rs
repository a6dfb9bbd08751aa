//! In-memory document.

use super::{Document, DocumentSnapshot, LineRecord, RelationRecord};
use crate::error::{DocumentError, DocumentResult};
use crate::geometry::finite_point;
use crate::ids::LineId;
use crate::subscription::{Callback, SubscriptionId, Subscribers};
use kurbo::Point;

/// Single-replica document for tests and offline use.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    contents: DocumentSnapshot,
    subscribers: Subscribers<DocumentSnapshot>,
}

impl MemoryDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing contents, e.g. a parsed snapshot. The records
    /// get the same checks as appended ones.
    pub fn from_snapshot(contents: DocumentSnapshot) -> DocumentResult<Self> {
        let mut doc = Self::new();
        for line in contents.lines {
            doc.insert_line(line)?;
        }
        doc.insert_relations(contents.relations)?;
        Ok(doc)
    }

    fn insert_line(&mut self, line: LineRecord) -> DocumentResult<()> {
        finite_point("x1", "y1", line.start)?;
        finite_point("x2", "y2", line.end)?;
        if self.contents.line(&line.id).is_some() {
            return Err(DocumentError::DuplicateLine(line.id));
        }
        self.contents.lines.push(line);
        Ok(())
    }

    fn insert_relations(&mut self, relations: Vec<RelationRecord>) -> DocumentResult<()> {
        for (i, relation) in relations.iter().enumerate() {
            let mut seen = self.contents.relations.iter().chain(&relations[..i]);
            if seen.any(|r| r.id == relation.id) {
                return Err(DocumentError::DuplicateRelation(relation.id.clone()));
            }
        }
        self.contents.relations.extend(relations);
        Ok(())
    }

    fn notify(&mut self) {
        let snapshot = self.contents.clone();
        self.subscribers.notify(&snapshot);
    }
}

impl Document for MemoryDocument {
    fn snapshot(&self) -> DocumentSnapshot {
        self.contents.clone()
    }

    fn append_line(&mut self, line: LineRecord, relations: Vec<RelationRecord>) -> DocumentResult<()> {
        let lines = self.contents.lines.len();
        self.insert_line(line)?;
        if let Err(err) = self.insert_relations(relations) {
            self.contents.lines.truncate(lines);
            return Err(err);
        }
        self.notify();
        Ok(())
    }

    fn update_line(&mut self, id: &LineId, start: Point, end: Point) -> DocumentResult<()> {
        let start = finite_point("x1", "y1", start)?;
        let end = finite_point("x2", "y2", end)?;
        let record = self
            .contents
            .lines
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| DocumentError::LineNotFound(id.clone()))?;
        record.start = start;
        record.end = end;
        self.notify();
        Ok(())
    }

    fn subscribe(&mut self, callback: Callback<DocumentSnapshot>) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RelationId;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(id: &str, x: f64) -> LineRecord {
        LineRecord::new(LineId::new(id), Point::new(x, 0.0), Point::new(x, 10.0))
    }

    #[test]
    fn test_append_and_update() {
        let mut doc = MemoryDocument::new();
        doc.append_line(record("a", 0.0), Vec::new()).unwrap();
        doc.update_line(&LineId::new("a"), Point::new(1.0, 1.0), Point::new(2.0, 2.0))
            .unwrap();

        let snapshot = doc.snapshot();
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].start, Point::new(1.0, 1.0));
        assert_eq!(snapshot.lines[0].end, Point::new(2.0, 2.0));
    }

    #[test]
    fn test_rejects_duplicates_and_unknown_lines() {
        let mut doc = MemoryDocument::new();
        doc.append_line(record("a", 0.0), Vec::new()).unwrap();
        assert!(matches!(
            doc.append_line(record("a", 5.0), Vec::new()),
            Err(DocumentError::DuplicateLine(_))
        ));
        assert!(matches!(
            doc.update_line(&LineId::new("zzz"), Point::ZERO, Point::ZERO),
            Err(DocumentError::LineNotFound(_))
        ));

        let relation = RelationRecord::new(RelationId::new("r"), LineId::new("a"), LineId::new("b"));
        doc.append_line(record("b", 1.0), vec![relation.clone()]).unwrap();
        assert!(matches!(
            doc.append_line(record("c", 2.0), vec![relation]),
            Err(DocumentError::DuplicateRelation(_))
        ));
        assert_eq!(doc.snapshot().lines.len(), 2);
    }

    #[test]
    fn test_rejects_non_finite_update() {
        let mut doc = MemoryDocument::new();
        doc.append_line(record("a", 0.0), Vec::new()).unwrap();
        let err = doc
            .update_line(&LineId::new("a"), Point::new(f64::NAN, 0.0), Point::ZERO)
            .unwrap_err();
        assert!(matches!(err, DocumentError::Validation(_)));
        assert_eq!(doc.snapshot().lines[0].start, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_from_snapshot_validates_records() {
        let doc = MemoryDocument::from_snapshot(DocumentSnapshot {
            lines: vec![record("a", 0.0), record("b", 1.0)],
            relations: vec![RelationRecord::new(RelationId::new("r"), LineId::new("a"), LineId::new("b"))],
        })
        .unwrap();
        assert_eq!(doc.snapshot().relations.len(), 1);

        let bad = DocumentSnapshot {
            lines: vec![LineRecord::new(LineId::new("a"), Point::new(0.0, f64::INFINITY), Point::ZERO)],
            relations: Vec::new(),
        };
        assert!(matches!(
            MemoryDocument::from_snapshot(bad),
            Err(DocumentError::Validation(_))
        ));

        let twice = DocumentSnapshot {
            lines: vec![record("a", 0.0), record("a", 1.0)],
            relations: Vec::new(),
        };
        assert!(matches!(
            MemoryDocument::from_snapshot(twice),
            Err(DocumentError::DuplicateLine(_))
        ));
    }

    #[test]
    fn test_subscribers_see_every_change() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut doc = MemoryDocument::new();
        let sink = Rc::clone(&seen);
        let sub = doc.subscribe(Box::new(move |snapshot: &DocumentSnapshot| {
            sink.borrow_mut().push(snapshot.lines.len());
        }));

        doc.append_line(record("a", 0.0), Vec::new()).unwrap();
        doc.append_line(record("b", 1.0), Vec::new()).unwrap();
        doc.update_line(&LineId::new("a"), Point::ZERO, Point::new(1.0, 1.0)).unwrap();
        assert!(doc.unsubscribe(sub));
        doc.append_line(record("c", 2.0), Vec::new()).unwrap();

        assert_eq!(*seen.borrow(), vec![1, 2, 2]);
    }
}
