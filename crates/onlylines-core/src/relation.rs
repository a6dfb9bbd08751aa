//! Relations between primitives and the points derived from them.

use crate::error::ValidationError;
use crate::geometry::{IntersectFn, Primitive, intersection_for};
use crate::ids::RelationId;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Index of a primitive in the view engine's arena.
pub type PrimitiveHandle = usize;

/// A derived point, keyed by the relation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionPoint {
    pub id: RelationId,
    pub x: f64,
    pub y: f64,
}

impl IntersectionPoint {
    pub fn create(relation: &Relation, coords: Point) -> Self {
        Self {
            id: relation.id.clone(),
            x: coords.x,
            y: coords.y,
        }
    }
}

/// Symmetric pairing of two primitives.
///
/// Holds arena handles rather than the primitives themselves, so the
/// derived point always reflects the members' current state.
#[derive(Debug, Clone)]
pub struct Relation {
    id: RelationId,
    members: [PrimitiveHandle; 2],
    intersect: IntersectFn,
}

impl Relation {
    /// Build a relation over `members`, resolved against `arena`.
    ///
    /// Fails unless there are exactly two members and an intersection
    /// routine exists for their kinds.
    pub fn new(
        id: RelationId,
        members: &[PrimitiveHandle],
        arena: &[Primitive],
    ) -> Result<Self, ValidationError> {
        let &[a, b] = members else {
            return Err(ValidationError::RelationArity {
                id,
                count: members.len(),
            });
        };
        let (kind_a, kind_b) = match (arena.get(a), arena.get(b)) {
            (Some(pa), Some(pb)) => (pa.kind(), pb.kind()),
            _ => {
                return Err(ValidationError::Malformed(format!(
                    "relation {id} refers past the end of the primitive arena"
                )));
            }
        };
        let intersect = intersection_for(kind_a, kind_b).ok_or(ValidationError::UnsupportedPair {
            id: id.clone(),
            a: kind_a,
            b: kind_b,
        })?;
        Ok(Self {
            id,
            members: [a, b],
            intersect,
        })
    }

    pub fn id(&self) -> &RelationId {
        &self.id
    }

    pub fn members(&self) -> [PrimitiveHandle; 2] {
        self.members
    }

    /// The current intersection of the two members, if there is exactly one.
    pub fn points(&self, arena: &[Primitive]) -> Option<IntersectionPoint> {
        let [a, b] = self.members;
        let coords = (self.intersect)(arena.get(a)?, arena.get(b)?)?;
        Some(IntersectionPoint::create(self, coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Line;
    use crate::ids::LineId;

    fn line(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Primitive {
        Primitive::Line(Line::new(LineId::new(id), Point::new(x1, y1), Point::new(x2, y2)).unwrap())
    }

    #[test]
    fn test_point_carries_relation_id() {
        let arena = vec![
            line("a", 0.0, 0.0, 100.0, 0.0),
            line("b", 50.0, 100.0, 50.0, -100.0),
        ];
        let relation = Relation::new(RelationId::new("rel"), &[0, 1], &arena).unwrap();
        let point = relation.points(&arena).unwrap();
        assert_eq!(point.id, RelationId::new("rel"));
        assert!((point.x - 50.0).abs() < 1e-6);
        assert!(point.y.abs() < 1e-6);
    }

    #[test]
    fn test_point_follows_member_changes() {
        let mut arena = vec![
            line("a", 0.0, 0.0, 100.0, 0.0),
            line("b", 50.0, 100.0, 50.0, -100.0),
        ];
        let relation = Relation::new(RelationId::new("rel"), &[0, 1], &arena).unwrap();

        if let Some(l) = arena[1].as_line_mut() {
            l.set_points(Point::new(-20.0, 100.0), Point::new(-20.0, -100.0)).unwrap();
        }
        let point = relation.points(&arena).unwrap();
        assert!((point.x + 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_members_have_no_point() {
        let arena = vec![line("a", 0.0, 0.0, 10.0, 0.0), line("b", 0.0, 5.0, 10.0, 5.0)];
        let relation = Relation::new(RelationId::new("rel"), &[0, 1], &arena).unwrap();
        assert!(relation.points(&arena).is_none());
    }

    #[test]
    fn test_arity_is_checked() {
        let arena = vec![line("a", 0.0, 0.0, 10.0, 0.0)];
        let err = Relation::new(RelationId::new("rel"), &[0], &arena).unwrap_err();
        assert!(matches!(err, ValidationError::RelationArity { count: 1, .. }));
        let err = Relation::new(RelationId::new("rel"), &[0, 0, 0], &arena).unwrap_err();
        assert!(matches!(err, ValidationError::RelationArity { count: 3, .. }));
    }
}
