//! Renders a joined state as a plain `serde_json::Value` tree: objects from
//! ORMap, arrays from ORArray, and — wherever concurrent writes leave more
//! than one surviving value — a JSON array standing in for the multi-value
//! set (MVReg, and ORArray's FIRST register when read directly).
use crate::causal_context::CausalContext;
use crate::dot::ReplicaId;
use crate::dotstore::{CrdtKind, DotStore, MapKey, Payload};
use crate::error::CrdtError;
use crate::mvreg::StateRef;
use crate::orarray;
use serde_json::{Map, Value};

fn payload_to_json(p: &Payload) -> Value {
    match p {
        Payload::Null => Value::Null,
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Num(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Payload::Str(s) => Value::String(s.clone()),
        Payload::Position(p) => Value::String(p.to_string()),
    }
}

fn multi_value_json<'a>(values: impl Iterator<Item = &'a Payload>) -> Value {
    let mut values: Vec<Value> = values.map(payload_to_json).collect();
    match values.len() {
        0 => Value::Null,
        1 => values.pop().unwrap(),
        _ => Value::Array(values),
    }
}

/// Renders the state reachable from `store` (with its causal context) as a
/// JSON value.
pub fn to_json<I: ReplicaId>(
    store: &DotStore<I>,
    cc: &CausalContext<I>,
) -> Result<Value, CrdtError> {
    match store {
        DotStore::Fun(m) => Ok(multi_value_json(m.values())),
        DotStore::FunMap(m) => {
            let rendered: Vec<Value> = m
                .values()
                .map(|child| to_json(child, cc))
                .collect::<Result<_, _>>()?;
            Ok(match rendered.len() {
                0 => Value::Null,
                1 => rendered.into_iter().next().unwrap(),
                _ => Value::Array(rendered),
            })
        }
        DotStore::Map(CrdtKind::ORMap, m) => {
            let mut obj = Map::new();
            for (key, child) in m {
                if let MapKey::Str(k) = key {
                    obj.insert(k.clone(), to_json(child, cc)?);
                }
            }
            Ok(Value::Object(obj))
        }
        DotStore::Map(CrdtKind::ORArray, _) => {
            let entries = orarray::value(StateRef::new(store, cc))?;
            let arr = entries
                .into_iter()
                .map(|(_, values)| multi_value_json(values.iter()))
                .collect();
            Ok(Value::Array(arr))
        }
    }
}
