//! List, map and string operations. Collections are values, every operation returns a new
//! collection and leaves its input untouched.

use im::Vector;
use indexmap::IndexMap;
use num_traits::ToPrimitive;

use crate::core::*;
use crate::vm::*;

const KEY_TYPES: &str = "num, bool or str";

pub fn to_key(op: &'static str, val: Value) -> Result<Key> {
    val.into_key().map_err(|v| type_mismatch(op, KEY_TYPES, &v))
}

/// builds a list from values in source order
pub fn build_list(elems: Vec<Value>) -> Value {
    Value::List(elems.into_iter().collect())
}

/// builds a map from alternating keys and values in source order. Later keys win
pub fn build_map(flat: Vec<Value>) -> Result<Value> {
    let mut entries = IndexMap::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        entries.insert(to_key("BUILD_MAP", k)?, v);
    }
    Ok(Value::Map(entries))
}

/// fails instead of aborting when the host can't hold `count` elements
pub fn list_fill(value: Value, count: usize) -> Result<Value> {
    let mut elems = Vec::new();
    elems
        .try_reserve_exact(count)
        .map_err(|_| RuntimeError::UnsupportedOperation {
            op: "LIST_FILL",
            detail: format!("can't allocate a list of {} elements", count),
        })?;
    elems.resize(count, value);
    Ok(Value::List(Vector::from(elems)))
}

pub fn head(coll: Value) -> Result<Value> {
    match coll {
        Value::List(elems) => elems.front().cloned().ok_or(RuntimeError::EmptyCollection { op: "HEAD" }),
        other => Err(type_mismatch("HEAD", "list", &other)),
    }
}

pub fn tail(coll: Value) -> Result<Value> {
    match coll {
        Value::List(elems) if elems.is_empty() => bail!(EmptyCollection { op: "TAIL" }),
        Value::List(elems) => Ok(Value::List(elems.skip(1))),
        other => Err(type_mismatch("TAIL", "list", &other)),
    }
}

pub fn is_empty(coll: Value) -> Result<Value> {
    Ok(Value::Bool(length_of("IS_EMPTY", &coll)? == 0))
}

pub fn length(coll: Value) -> Result<Value> {
    Ok(Value::int(length_of("LENGTH", &coll)? as i64))
}

fn length_of(op: &'static str, coll: &Value) -> Result<usize> {
    match coll {
        Value::List(elems) => Ok(elems.len()),
        Value::Map(entries) => Ok(entries.len()),
        Value::Str(s) => Ok(s.chars().count()),
        other => Err(type_mismatch(op, "list, map or str", other)),
    }
}

pub fn cons(list: Value, elem: Value) -> Result<Value> {
    match list {
        Value::List(mut elems) => {
            elems.push_front(elem);
            Ok(Value::List(elems))
        }
        other => Err(type_mismatch("CONS", "list", &other)),
    }
}

pub fn append(list: Value, elem: Value) -> Result<Value> {
    match list {
        Value::List(mut elems) => {
            elems.push_back(elem);
            Ok(Value::List(elems))
        }
        other => Err(type_mismatch("APPEND", "list", &other)),
    }
}

pub fn keys(map: Value) -> Result<Value> {
    match map {
        Value::Map(entries) => Ok(Value::list(entries.into_keys().map(Value::from))),
        other => Err(type_mismatch("KEYS", "map", &other)),
    }
}

pub fn values(map: Value) -> Result<Value> {
    match map {
        Value::Map(entries) => Ok(Value::list(entries.into_values())),
        other => Err(type_mismatch("VALUES", "map", &other)),
    }
}

/// every entry becomes a two element list `[key, value]`
pub fn items(map: Value) -> Result<Value> {
    match map {
        Value::Map(entries) => Ok(Value::list(
            entries
                .into_iter()
                .map(|(k, v)| Value::list([Value::from(k), v])),
        )),
        other => Err(type_mismatch("ITEMS", "map", &other)),
    }
}

/// removes a key from a map or an index from a list
pub fn delete(coll: Value, key: Value) -> Result<Value> {
    match coll {
        Value::Map(mut entries) => {
            let key = to_key("DELETE", key)?;
            if entries.shift_remove(&key).is_none() {
                bail!(KeyNotFound {
                    key: key.to_string()
                });
            }
            Ok(Value::Map(entries))
        }
        Value::List(mut elems) => {
            let idx = index("DELETE", &key, elems.len())?;
            elems.remove(idx);
            Ok(Value::List(elems))
        }
        other => Err(type_mismatch("DELETE", "list or map", &other)),
    }
}

/// element of a list, value of a map, or character of a string
pub fn find(coll: Value, key: Value) -> Result<Value> {
    match coll {
        Value::Map(entries) => {
            let key = to_key("FIND", key)?;
            match entries.get(&key) {
                Some(v) => Ok(v.clone()),
                None => bail!(KeyNotFound {
                    key: key.to_string()
                }),
            }
        }
        Value::List(elems) => {
            let idx = index("FIND", &key, elems.len())?;
            Ok(elems[idx].clone())
        }
        Value::Str(s) => {
            let idx = index("FIND", &key, s.chars().count())?;
            Ok(Value::Str(s.chars().skip(idx).take(1).collect()))
        }
        other => Err(type_mismatch("FIND", "list, map or str", &other)),
    }
}

/// sets an existing list element, or inserts into a map
pub fn put(coll: Value, key: Value, value: Value) -> Result<Value> {
    match coll {
        Value::Map(mut entries) => {
            entries.insert(to_key("PUT", key)?, value);
            Ok(Value::Map(entries))
        }
        Value::List(mut elems) => {
            let idx = index("PUT", &key, elems.len())?;
            elems.set(idx, value);
            Ok(Value::List(elems))
        }
        other => Err(type_mismatch("PUT", "list or map", &other)),
    }
}

fn index(op: &'static str, key: &Value, len: usize) -> Result<usize> {
    let n = match key {
        Value::Num(n) if n.is_integer() => n,
        other => return Err(type_mismatch(op, "integer", other)),
    };
    match n.numer().to_usize() {
        Some(idx) if idx < len => Ok(idx),
        _ => bail!(IndexOutOfBounds {
            index: key.to_string(),
            len
        }),
    }
}

/// `s ++ t ++ ...`, parts are in source order
pub fn concat(parts: Vec<Value>) -> Result<Value> {
    let mut res = String::new();
    for part in parts {
        match part {
            Value::Str(s) => res.push_str(&s),
            other => return Err(type_mismatch("STR_CAT", "str", &other)),
        }
    }
    Ok(Value::Str(res))
}

/// Slices by characters. Negative indices count from the end, out of range indices are
/// clamped, a negative step walks backwards.
pub fn slice(s: &str, start: &Value, stop: &Value, step: &Value) -> Result<Value> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let (start, stop, step) = (
        slice_arg(start)?,
        slice_arg(stop)?,
        slice_arg(step)?,
    );
    if step == 0 {
        bail!(UnsupportedOperation {
            op: "STR_SLICE",
            detail: "step must not be zero".into(),
        });
    }
    let clamp = |i: i64| {
        let i = if i < 0 { i + len } else { i };
        if step > 0 {
            i.clamp(0, len)
        } else {
            i.clamp(-1, len - 1)
        }
    };
    let (mut i, stop) = (clamp(start), clamp(stop));
    let mut res = String::new();
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        res.push(chars[i as usize]);
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::Str(res))
}

fn slice_arg(val: &Value) -> Result<i64> {
    match val {
        Value::Num(n) if n.is_integer() => {
            n.numer()
                .to_i64()
                .ok_or_else(|| RuntimeError::UnsupportedOperation {
                    op: "STR_SLICE",
                    detail: format!("{} is too large for a slice", val),
                })
        }
        other => Err(type_mismatch("STR_SLICE", "integer", other)),
    }
}
