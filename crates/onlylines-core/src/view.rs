//! Render-ready view of the document and the engine that derives it.

use crate::document::DocumentSnapshot;
use crate::error::{Error, StateConsistencyError, ValidationError};
use crate::geometry::{Bounds, Line, Primitive, finite_point};
use crate::ids::{LineId, RelationId};
use crate::relation::{IntersectionPoint, PrimitiveHandle, Relation};
use crate::subscription::{Callback, SubscriptionId, Subscribers};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Serialize a point as `[x, y]`.
mod point_pair {
    use kurbo::Point;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        [point.x, point.y].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        let [x, y] = <[f64; 2]>::deserialize(deserializer)?;
        Ok(Point::new(x, y))
    }
}

/// A line clipped for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub id: LineId,
    #[serde(with = "point_pair")]
    pub start: Point,
    #[serde(with = "point_pair")]
    pub end: Point,
}

/// Everything a renderer needs for one frame. Replaced wholesale on
/// every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub bounds: Bounds,
    pub points: Vec<IntersectionPoint>,
    pub lines: Vec<LineSegment>,
}

impl ViewState {
    pub fn empty(bounds: Bounds) -> Self {
        Self {
            bounds,
            points: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Result of a nearest-line query.
#[derive(Debug, Clone, Copy)]
pub struct NearestLine<'a> {
    pub line: &'a Line,
    pub distance: f64,
}

/// Keeps an identity-keyed cache of lines and relations in step with
/// document snapshots and derives a fresh [`ViewState`] from it.
///
/// Cache entries live in arenas and are never removed, so a handle keeps
/// pointing at the same logical entity across passes.
#[derive(Debug)]
pub struct ViewStateEngine {
    bounds: Bounds,
    primitives: Vec<Primitive>,
    line_index: HashMap<LineId, PrimitiveHandle>,
    relations: Vec<Relation>,
    relation_index: HashMap<RelationId, usize>,
    /// Line handles in the order of the last snapshot.
    line_order: Vec<PrimitiveHandle>,
    /// Relation indices in the order of the last snapshot.
    relation_order: Vec<usize>,
    view: ViewState,
    subscribers: Subscribers<ViewState>,
}

impl ViewStateEngine {
    /// Create an engine with an empty cache for a `bounds` viewport.
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            primitives: Vec::new(),
            line_index: HashMap::new(),
            relations: Vec::new(),
            relation_index: HashMap::new(),
            line_order: Vec::new(),
            relation_order: Vec::new(),
            view: ViewState::empty(bounds),
            subscribers: Subscribers::new(),
        }
    }

    /// Current viewport.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// The last published view.
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Look up a cached line by id. Reflects the last successful pass.
    pub fn line(&self, id: &LineId) -> Option<&Line> {
        let handle = *self.line_index.get(id)?;
        self.primitives.get(handle)?.as_line()
    }

    /// Cached lines in snapshot order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> + '_ {
        self.line_order
            .iter()
            .filter_map(|&h| self.primitives.get(h).and_then(Primitive::as_line))
    }

    /// Number of cached lines.
    pub fn line_count(&self) -> usize {
        self.line_index.len()
    }

    /// Number of cached relations.
    pub fn relation_count(&self) -> usize {
        self.relation_index.len()
    }

    /// Register a callback that receives every published view.
    pub fn subscribe(&mut self, callback: Callback<ViewState>) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    /// Remove a callback. Returns false if `id` was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Bring the cache in line with `snapshot`, rebuild the view and
    /// publish it.
    ///
    /// The snapshot is checked before the cache is touched. A bad
    /// coordinate or a relation whose line is neither cached nor in the
    /// snapshot aborts the pass; the cache and the published view stay as
    /// they were.
    pub fn recompute(&mut self, snapshot: &DocumentSnapshot) -> Result<&ViewState, Error> {
        self.check_snapshot(snapshot)?;

        let mut line_order = Vec::with_capacity(snapshot.lines.len());
        for record in &snapshot.lines {
            let handle = match self.line_index.get(&record.id) {
                Some(&handle) => {
                    if let Some(line) = self.primitives[handle].as_line_mut() {
                        line.set_points(record.start, record.end)?;
                    }
                    handle
                }
                None => {
                    let line = record.to_line()?;
                    let handle = self.primitives.len();
                    self.primitives.push(Primitive::Line(line));
                    self.line_index.insert(record.id.clone(), handle);
                    handle
                }
            };
            line_order.push(handle);
        }

        let mut relation_order = Vec::with_capacity(snapshot.relations.len());
        for record in &snapshot.relations {
            // Membership is immutable, so a cached relation needs no update.
            if let Some(&index) = self.relation_index.get(&record.id) {
                relation_order.push(index);
                continue;
            }

            let mut handles = Vec::with_capacity(record.members.len());
            for member in &record.members {
                let Some(&handle) = self.line_index.get(member) else {
                    return Err(missing_line(&record.id, member));
                };
                handles.push(handle);
            }
            let relation = Relation::new(record.id.clone(), &handles, &self.primitives)?;
            let index = self.relations.len();
            self.relations.push(relation);
            self.relation_index.insert(record.id.clone(), index);
            relation_order.push(index);
        }

        self.line_order = line_order;
        self.relation_order = relation_order;
        self.rebuild_view();
        self.subscribers.notify(&self.view);
        Ok(&self.view)
    }

    /// Everything in `recompute` that can fail, without mutating.
    fn check_snapshot(&self, snapshot: &DocumentSnapshot) -> Result<(), Error> {
        let mut incoming = HashSet::with_capacity(snapshot.lines.len());
        for record in &snapshot.lines {
            finite_point("x1", "y1", record.start)?;
            finite_point("x2", "y2", record.end)?;
            incoming.insert(&record.id);
        }

        for record in &snapshot.relations {
            if self.relation_index.contains_key(&record.id) {
                continue;
            }
            if record.members.len() != 2 {
                return Err(ValidationError::RelationArity {
                    id: record.id.clone(),
                    count: record.members.len(),
                }
                .into());
            }
            if let Some(member) = record
                .members
                .iter()
                .find(|m| !self.line_index.contains_key(*m) && !incoming.contains(m))
            {
                return Err(missing_line(&record.id, member));
            }
        }
        Ok(())
    }

    /// Change the viewport and republish the view from the cache.
    pub fn set_bounds(&mut self, bounds: Bounds) -> &ViewState {
        self.bounds = bounds;
        self.rebuild_view();
        self.subscribers.notify(&self.view);
        &self.view
    }

    fn rebuild_view(&mut self) {
        let lines = self
            .line_order
            .iter()
            .filter_map(|&h| self.primitives.get(h).and_then(Primitive::as_line))
            .map(|line| {
                let [start, end] = line.create_full_line(&self.bounds);
                LineSegment {
                    id: line.id().clone(),
                    start,
                    end,
                }
            })
            .collect();

        let mut points = Vec::with_capacity(self.relation_order.len());
        for &index in &self.relation_order {
            let relation = &self.relations[index];
            match relation.points(&self.primitives) {
                Some(point) => points.push(point),
                None => log::trace!("Relation {} has no single intersection", relation.id()),
            }
        }

        self.view = ViewState {
            bounds: self.bounds,
            points,
            lines,
        };
        log::debug!(
            "Recomputed view: {} lines, {} relations, {} points",
            self.view.lines.len(),
            self.relation_order.len(),
            self.view.points.len()
        );
    }

    /// The cached line closest to `point` by perpendicular distance.
    pub fn nearest_line(&self, point: Point) -> Option<NearestLine<'_>> {
        let mut nearest: Option<NearestLine<'_>> = None;
        for line in self.lines() {
            let distance = line.distance_to_point(point);
            if nearest.is_none_or(|n| distance < n.distance) {
                nearest = Some(NearestLine { line, distance });
            }
        }
        nearest
    }
}

fn missing_line(relation: &RelationId, line: &LineId) -> Error {
    let err = StateConsistencyError::MissingLine {
        relation: relation.clone(),
        line: line.clone(),
    };
    log::error!("Aborting recompute: {}", err);
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LineRecord, RelationRecord};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn bounds() -> Bounds {
        Bounds::new(800.0, 600.0).unwrap()
    }

    fn record(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> LineRecord {
        LineRecord::new(LineId::new(id), Point::new(x1, y1), Point::new(x2, y2))
    }

    fn relation(id: &str, a: &str, b: &str) -> RelationRecord {
        RelationRecord::new(RelationId::new(id), LineId::new(a), LineId::new(b))
    }

    fn cross_snapshot() -> DocumentSnapshot {
        DocumentSnapshot {
            lines: vec![
                record("a", 0.0, 0.0, 100.0, 0.0),
                record("b", 50.0, 100.0, 50.0, -100.0),
                record("c", 0.0, 10.0, 100.0, 10.0),
            ],
            relations: vec![relation("ab", "a", "b"), relation("ac", "a", "c"), relation("bc", "b", "c")],
        }
    }

    #[test]
    fn test_recompute_builds_segments_and_points() {
        let mut engine = ViewStateEngine::new(bounds());
        let view = engine.recompute(&cross_snapshot()).unwrap();

        let ids: Vec<&str> = view.lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        // a and c are parallel.
        let point_ids: Vec<&str> = view.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(point_ids, vec!["ab", "bc"]);
        assert!((view.points[0].x - 50.0).abs() < 1e-3);
        assert!(view.points[0].y.abs() < 1e-3);
        assert!((view.points[1].y - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_replay_is_value_identical() {
        let snapshot = cross_snapshot();
        let mut engine = ViewStateEngine::new(bounds());
        let first = engine.recompute(&snapshot).unwrap().clone();
        let second = engine.recompute(&snapshot).unwrap().clone();
        assert_eq!(first, second);

        let mut fresh = ViewStateEngine::new(bounds());
        assert_eq!(fresh.recompute(&snapshot).unwrap(), &first);
    }

    #[test]
    fn test_updates_reuse_cache_entries() {
        let mut engine = ViewStateEngine::new(bounds());
        let mut snapshot = cross_snapshot();
        engine.recompute(&snapshot).unwrap();

        snapshot.lines[1] = record("b", -30.0, 100.0, -30.0, -100.0);
        let view = engine.recompute(&snapshot).unwrap();
        assert!((view.points[0].x + 30.0).abs() < 1e-3);
        assert_eq!(engine.line_count(), 3);
        assert_eq!(engine.relation_count(), 3);
        assert_eq!(engine.line(&LineId::new("b")).unwrap().start(), Point::new(-30.0, 100.0));
    }

    #[test]
    fn test_missing_line_aborts_pass() {
        let mut engine = ViewStateEngine::new(bounds());
        engine.recompute(&cross_snapshot()).unwrap();
        let before = engine.view().clone();

        let mut broken = cross_snapshot();
        broken.lines[1] = record("b", -30.0, 100.0, -30.0, -100.0);
        broken.lines.push(record("d", 0.0, 0.0, 10.0, 10.0));
        broken.relations.push(relation("ad", "a", "d"));
        broken.relations.push(relation("ax", "a", "ghost"));
        let err = engine.recompute(&broken).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency(StateConsistencyError::MissingLine { .. })
        ));
        assert_eq!(engine.view(), &before);

        // Nothing from the rejected snapshot reached the cache.
        assert_eq!(engine.line(&LineId::new("b")).unwrap().start(), Point::new(50.0, 100.0));
        assert!(engine.line(&LineId::new("d")).is_none());
        assert_eq!(engine.line_count(), 3);
        assert_eq!(engine.relation_count(), 3);
        let view = engine.set_bounds(bounds());
        assert_eq!(view, &before);
    }

    #[test]
    fn test_non_finite_line_aborts_pass() {
        let mut engine = ViewStateEngine::new(bounds());
        engine.recompute(&cross_snapshot()).unwrap();

        let mut broken = cross_snapshot();
        broken.lines[0] = record("a", 5.0, 5.0, 100.0, 5.0);
        broken.lines[2] = record("c", f64::NAN, 10.0, 100.0, 10.0);
        let err = engine.recompute(&broken).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::NonFinite { .. })));
        assert_eq!(engine.line(&LineId::new("a")).unwrap().start(), Point::ZERO);
    }

    #[test]
    fn test_relation_arity_checked_before_mutation() {
        let mut engine = ViewStateEngine::new(bounds());
        let mut snapshot = cross_snapshot();
        snapshot.relations.push(RelationRecord {
            id: RelationId::new("abc"),
            members: vec![LineId::new("a"), LineId::new("b"), LineId::new("c")],
        });
        let err = engine.recompute(&snapshot).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::RelationArity { count: 3, .. })
        ));
        assert_eq!(engine.line_count(), 0);
    }

    #[test]
    fn test_relation_before_lines_in_same_snapshot() {
        // Relations are resolved after all lines of the snapshot.
        let snapshot = DocumentSnapshot {
            lines: vec![record("a", 0.0, 0.0, 1.0, 1.0), record("b", 0.0, 1.0, 1.0, 0.0)],
            relations: vec![relation("ab", "a", "b")],
        };
        let mut engine = ViewStateEngine::new(bounds());
        assert_eq!(engine.recompute(&snapshot).unwrap().points.len(), 1);
    }

    #[test]
    fn test_subscribers_receive_each_pass() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut engine = ViewStateEngine::new(bounds());
        let sink = Rc::clone(&seen);
        engine.subscribe(Box::new(move |view: &ViewState| {
            sink.borrow_mut().push(view.lines.len());
        }));

        engine.recompute(&DocumentSnapshot::default()).unwrap();
        engine.recompute(&cross_snapshot()).unwrap();
        engine.set_bounds(Bounds::new(100.0, 100.0).unwrap());
        assert_eq!(*seen.borrow(), vec![0, 3, 3]);
    }

    #[test]
    fn test_nearest_line() {
        let mut engine = ViewStateEngine::new(bounds());
        assert!(engine.nearest_line(Point::ZERO).is_none());
        engine.recompute(&cross_snapshot()).unwrap();

        let nearest = engine.nearest_line(Point::new(200.0, 8.0)).unwrap();
        assert_eq!(nearest.line.id(), &LineId::new("c"));
        assert!((nearest.distance - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_view_wire_shape() {
        let mut engine = ViewStateEngine::new(Bounds::new(3.0, 4.0).unwrap());
        let snapshot = DocumentSnapshot {
            lines: vec![record("a", 0.0, 0.0, 1.0, 0.0)],
            relations: Vec::new(),
        };
        let json = engine.recompute(&snapshot).unwrap().to_json();
        assert_eq!(
            json,
            r#"{"bounds":{"w":3.0,"h":4.0,"diagonal":5.0},"points":[],"lines":[{"id":"a","start":[-1.5,0.0],"end":[3.5,0.0]}]}"#
        );
    }
}
