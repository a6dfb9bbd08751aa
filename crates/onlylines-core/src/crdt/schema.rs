//! Loro document schema and operations.

use super::convert::{line_from_loro, line_to_loro, relation_from_loro, relation_to_loro};
use crate::document::{Document, DocumentSnapshot, LineRecord, RelationRecord};
use crate::error::{DocumentError, DocumentResult};
use crate::geometry::finite_point;
use crate::ids::LineId;
use crate::subscription::{Callback, SubscriptionId, Subscribers};
use kurbo::Point;
use loro::{ExportMode, LoroDoc, LoroList, LoroMap, LoroValue, ValueOrContainer};

/// Key for the lines map in the document.
pub const LINES_KEY: &str = "lines";
/// Key for the list of line ids in append order.
pub const LINE_ORDER_KEY: &str = "line_order";
/// Key for the relations map in the document.
pub const RELATIONS_KEY: &str = "relations";
/// Key for the list of relation ids in append order.
pub const RELATION_ORDER_KEY: &str = "relation_order";

/// A CRDT-backed document shared between peers.
///
/// Wraps a `LoroDoc`. Local changes are committed immediately; remote
/// changes arrive through [`CrdtDocument::import`]. Either way the
/// subscribers see a fresh snapshot once the change is applied.
pub struct CrdtDocument {
    doc: LoroDoc,
    subscribers: Subscribers<DocumentSnapshot>,
}

impl CrdtDocument {
    /// Create a new empty CRDT document.
    pub fn new() -> Self {
        Self {
            doc: LoroDoc::new(),
            subscribers: Subscribers::new(),
        }
    }

    /// Create a CRDT document from a snapshot exported by a peer.
    pub fn from_snapshot(bytes: &[u8]) -> DocumentResult<Self> {
        let doc = LoroDoc::new();
        doc.import(bytes)?;
        Ok(Self {
            doc,
            subscribers: Subscribers::new(),
        })
    }

    /// Get the underlying LoroDoc.
    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    pub fn peer_id(&self) -> u64 {
        self.doc.peer_id()
    }

    fn lines_map(&self) -> LoroMap {
        self.doc.get_map(LINES_KEY)
    }

    fn line_order_list(&self) -> LoroList {
        self.doc.get_list(LINE_ORDER_KEY)
    }

    fn relations_map(&self) -> LoroMap {
        self.doc.get_map(RELATIONS_KEY)
    }

    fn relation_order_list(&self) -> LoroList {
        self.doc.get_list(RELATION_ORDER_KEY)
    }

    pub fn line_count(&self) -> usize {
        self.lines_map().len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations_map().len()
    }

    fn ordered_ids(list: &LoroList) -> Vec<String> {
        let mut result = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            if let Some(ValueOrContainer::Value(LoroValue::String(id))) = list.get(i) {
                result.push(id.to_string());
            }
        }
        result
    }

    fn contains_line(&self, id: &LineId) -> bool {
        self.lines_map().get(id.as_str()).is_some()
    }

    /// Export the document as a snapshot (full state).
    pub fn export_snapshot(&self) -> Vec<u8> {
        self.doc.export(ExportMode::Snapshot).unwrap_or_default()
    }

    /// Export incremental updates since a version.
    pub fn export_updates(&self, since: &loro::VersionVector) -> Vec<u8> {
        self.doc.export(ExportMode::updates(since)).unwrap_or_default()
    }

    /// Merge updates or a snapshot from another peer.
    pub fn import(&mut self, bytes: &[u8]) -> DocumentResult<()> {
        self.doc.import(bytes)?;
        log::debug!("Imported {} bytes from peer", bytes.len());
        self.notify();
        Ok(())
    }

    /// Get the current version vector.
    pub fn version(&self) -> loro::VersionVector {
        self.doc.oplog_vv()
    }

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers.notify(&snapshot);
    }
}

impl Document for CrdtDocument {
    fn snapshot(&self) -> DocumentSnapshot {
        let mut snapshot = DocumentSnapshot::default();

        if let LoroValue::Map(lines) = self.lines_map().get_deep_value() {
            for id in Self::ordered_ids(&self.line_order_list()) {
                match lines.get(&id) {
                    Some(LoroValue::Map(line)) => match line_from_loro(line) {
                        Some(record) => snapshot.lines.push(record),
                        None => log::warn!("Skipping unreadable line {}", id),
                    },
                    _ => log::warn!("Line {} is ordered but has no data", id),
                }
            }
        }

        if let LoroValue::Map(relations) = self.relations_map().get_deep_value() {
            for id in Self::ordered_ids(&self.relation_order_list()) {
                match relations.get(&id) {
                    Some(LoroValue::Map(relation)) => match relation_from_loro(relation) {
                        Some(record) => snapshot.relations.push(record),
                        None => log::warn!("Skipping unreadable relation {}", id),
                    },
                    _ => log::warn!("Relation {} is ordered but has no data", id),
                }
            }
        }

        snapshot
    }

    fn append_line(&mut self, line: LineRecord, relations: Vec<RelationRecord>) -> DocumentResult<()> {
        finite_point("x1", "y1", line.start)?;
        finite_point("x2", "y2", line.end)?;
        if self.contains_line(&line.id) {
            return Err(DocumentError::DuplicateLine(line.id));
        }
        let relations_map = self.relations_map();
        for relation in &relations {
            if relations_map.get(relation.id.as_str()).is_some() {
                return Err(DocumentError::DuplicateRelation(relation.id.clone()));
            }
        }

        let line_map = self.lines_map().insert_container(line.id.as_str(), LoroMap::new())?;
        line_to_loro(&line, &line_map)?;
        self.line_order_list()
            .push(LoroValue::String(line.id.to_string().into()))?;

        let relation_order = self.relation_order_list();
        for relation in &relations {
            let relation_map = relations_map.insert_container(relation.id.as_str(), LoroMap::new())?;
            relation_to_loro(relation, &relation_map)?;
            relation_order.push(LoroValue::String(relation.id.to_string().into()))?;
        }

        self.doc.commit();
        self.notify();
        Ok(())
    }

    fn update_line(&mut self, id: &LineId, start: Point, end: Point) -> DocumentResult<()> {
        let start = finite_point("x1", "y1", start)?;
        let end = finite_point("x2", "y2", end)?;
        if !self.contains_line(id) {
            return Err(DocumentError::LineNotFound(id.clone()));
        }

        // Replace the line data; the order list is untouched.
        let lines = self.lines_map();
        lines.delete(id.as_str())?;
        let line_map = lines.insert_container(id.as_str(), LoroMap::new())?;
        line_to_loro(&LineRecord::new(id.clone(), start, end), &line_map)?;

        self.doc.commit();
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

impl Default for CrdtDocument {
    fn default() -> Self {
        Self::new()
    }
}
