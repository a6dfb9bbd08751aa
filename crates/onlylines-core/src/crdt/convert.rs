//! Conversion between document records and Loro values.

use crate::document::{LineRecord, RelationRecord};
use crate::ids::{LineId, RelationId};
use kurbo::Point;
use loro::{LoroList, LoroMap, LoroMapValue, LoroResult, LoroValue};

// Common keys
const KEY_ID: &str = "id";

// Line keys
const KEY_X1: &str = "x1";
const KEY_Y1: &str = "y1";
const KEY_X2: &str = "x2";
const KEY_Y2: &str = "y2";

// Relation keys
const KEY_MEMBERS: &str = "members";

fn get_double(map: &LoroMapValue, key: &str) -> Option<f64> {
    match map.get(key)? {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

fn get_string(map: &LoroMapValue, key: &str) -> Option<String> {
    match map.get(key)? {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    }
}

/// Write a line's coordinates into `map`.
pub fn line_to_loro(line: &LineRecord, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_ID, line.id.to_string())?;
    map.insert(KEY_X1, line.start.x)?;
    map.insert(KEY_Y1, line.start.y)?;
    map.insert(KEY_X2, line.end.x)?;
    map.insert(KEY_Y2, line.end.y)?;
    Ok(())
}

pub fn line_from_loro(map: &LoroMapValue) -> Option<LineRecord> {
    Some(LineRecord::new(
        LineId::new(get_string(map, KEY_ID)?),
        Point::new(get_double(map, KEY_X1)?, get_double(map, KEY_Y1)?),
        Point::new(get_double(map, KEY_X2)?, get_double(map, KEY_Y2)?),
    ))
}

pub fn relation_to_loro(relation: &RelationRecord, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_ID, relation.id.to_string())?;
    let members = map.insert_container(KEY_MEMBERS, LoroList::new())?;
    for member in &relation.members {
        members.push(LoroValue::String(member.to_string().into()))?;
    }
    Ok(())
}

pub fn relation_from_loro(map: &LoroMapValue) -> Option<RelationRecord> {
    let id = RelationId::new(get_string(map, KEY_ID)?);
    let members = match map.get(KEY_MEMBERS)? {
        LoroValue::List(list) => list
            .iter()
            .filter_map(|v| match v {
                LoroValue::String(s) => Some(LineId::new(s.to_string())),
                _ => None,
            })
            .collect(),
        _ => return None,
    };
    Some(RelationRecord { id, members })
}
