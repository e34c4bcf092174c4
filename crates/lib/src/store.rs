//! In-memory keyspace for the data-type command handlers.
//!
//! The store is a flat map from key to value. Scalar writes pass through an
//! adapt-on-write coercion so numeric strings are stored as numbers; list
//! commands operate on `Value::List` entries and fail with a structured error
//! when aimed at anything else. All operations take the store mutex for their
//! full read-modify-write cycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use thiserror::Error as ThisError;

/// Errors from data-store operations.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum StoreError {
    /// A list command was aimed at a key that does not hold a list.
    #[error("value at key {key} is not a list")]
    WrongType {
        /// The key holding the non-list value
        key: String,
    },

    /// A push variant that requires an existing list found none.
    #[error("no list at key {key}")]
    NoSuchList {
        /// The missing key
        key: String,
    },

    /// An index fell outside the list.
    #[error("index {index} must be within list range (length {len})")]
    IndexOutOfRange {
        /// The requested index
        index: i64,
        /// The list length at the time of the call
        len: usize,
    },

    /// A start/end pair did not describe a usable range.
    #[error("invalid range: {reason}")]
    BadRange {
        /// Description of the violation
        reason: String,
    },
}

impl StoreError {
    /// Check if this error indicates a missing list.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NoSuchList { .. })
    }

    /// Check if this error is a type mismatch.
    pub fn is_type_error(&self) -> bool {
        matches!(self, StoreError::WrongType { .. })
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}

/// A stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    List(Vec<Value>),
}

impl Value {
    /// Coerce a raw wire token into its natural representation.
    ///
    /// Integers win over floats, floats over strings.
    pub fn adapt(raw: &str) -> Value {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::Int(n);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Str(raw.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", rendered.join(" "))
            }
        }
    }
}

/// Which end of a list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Parse a LEFT/RIGHT token, case-insensitively.
    pub fn parse(token: &str) -> Option<Side> {
        if token.eq_ignore_ascii_case("left") {
            Some(Side::Left)
        } else if token.eq_ignore_ascii_case("right") {
            Some(Side::Right)
        } else {
            None
        }
    }
}

/// The in-memory keyspace.
#[derive(Debug, Default)]
pub struct Store {
    data: Mutex<HashMap<String, Value>>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a value by key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().unwrap().get(key).cloned()
    }

    /// Set a key to a value, replacing whatever was there.
    pub fn set(&self, key: &str, value: Value) {
        self.data.lock().unwrap().insert(key.to_string(), value);
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    /// Check whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.lock().unwrap().is_empty()
    }

    /// Length of the list at `key`.
    pub fn llen(&self, key: &str) -> Result<usize, StoreError> {
        let data = self.data.lock().unwrap();
        Ok(list_ref(&data, key)?.len())
    }

    /// Element of the list at `key` by index.
    pub fn lindex(&self, key: &str, index: i64) -> Result<Value, StoreError> {
        let data = self.data.lock().unwrap();
        let list = list_ref(&data, key)?;
        let idx = in_range(index, list.len())?;
        Ok(list[idx].clone())
    }

    /// Range of elements between `start` and `end`.
    ///
    /// `end == -1` reads to the end of the list. A start greater than the end
    /// yields the elements in reverse order.
    pub fn lrange(&self, key: &str, start: i64, end: i64) -> Result<Vec<Value>, StoreError> {
        let data = self.data.lock().unwrap();
        let list = list_ref(&data, key)?;

        let start = in_range(start, list.len()).map_err(|_| StoreError::BadRange {
            reason: "start index not within list range".to_string(),
        })?;

        if end == -1 {
            return Ok(list[start..].to_vec());
        }

        let end = in_range(end, list.len()).map_err(|_| StoreError::BadRange {
            reason: "end index must be within list range or -1".to_string(),
        })?;

        if start == end {
            return Err(StoreError::BadRange {
                reason: "start and end indices cannot be equal".to_string(),
            });
        }

        if start < end {
            Ok(list[start..=end].to_vec())
        } else {
            Ok(list[end..=start].iter().rev().cloned().collect())
        }
    }

    /// Overwrite the element at `index` in the list at `key`.
    pub fn lset(&self, key: &str, index: i64, value: Value) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        let list = list_mut(&mut data, key)?;
        let idx = in_range(index, list.len())?;
        list[idx] = value;
        Ok(())
    }

    /// Trim the list at `key` to the `start..end` range (`end == -1` keeps the
    /// tail from `start` on).
    pub fn ltrim(&self, key: &str, start: i64, end: i64) -> Result<(), StoreError> {
        if end < start && end != -1 {
            return Err(StoreError::BadRange {
                reason: "end index must be greater than start index or -1".to_string(),
            });
        }

        let mut data = self.data.lock().unwrap();
        let list = list_mut(&mut data, key)?;
        let start = in_range(start, list.len()).map_err(|_| StoreError::BadRange {
            reason: "start index must be within list boundary".to_string(),
        })?;

        if end == -1 || end as usize > list.len() {
            list.drain(..start);
        } else {
            let end = end as usize;
            list.truncate(end);
            list.drain(..start);
        }
        Ok(())
    }

    /// Remove up to `count` occurrences of `value` from the list at `key`.
    ///
    /// A positive count scans from the head, a negative count from the tail,
    /// and zero leaves the list untouched.
    pub fn lrem(&self, key: &str, count: i64, value: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        let list = list_mut(&mut data, key)?;

        let mut remaining = count.unsigned_abs();
        let mut keep = vec![true; list.len()];

        if count > 0 {
            for (i, elem) in list.iter().enumerate() {
                if remaining == 0 {
                    break;
                }
                if elem.to_string() == value {
                    keep[i] = false;
                    remaining -= 1;
                }
            }
        } else if count < 0 {
            for (i, elem) in list.iter().enumerate().rev() {
                if remaining == 0 {
                    break;
                }
                if elem.to_string() == value {
                    keep[i] = false;
                    remaining -= 1;
                }
            }
        }

        let mut kept = keep.iter();
        list.retain(|_| *kept.next().unwrap());
        Ok(())
    }

    /// Move one element from `source` to `destination`.
    pub fn lmove(
        &self,
        source: &str,
        destination: &str,
        from: Side,
        to: Side,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();

        // Both ends must already be lists before anything moves.
        list_ref(&data, source)?;
        list_ref(&data, destination)?;

        let elem = {
            let src = list_mut(&mut data, source)?;
            if src.is_empty() {
                return Err(StoreError::IndexOutOfRange { index: 0, len: 0 });
            }
            match from {
                Side::Left => src.remove(0),
                Side::Right => src.pop().unwrap(),
            }
        };

        let dst = list_mut(&mut data, destination)?;
        match to {
            Side::Left => dst.insert(0, elem),
            Side::Right => dst.push(elem),
        }
        Ok(())
    }

    /// Push elements onto the list at `key`.
    ///
    /// With `require_exists` the push fails when no list is present (the
    /// LPUSHX/RPUSHX variants); otherwise a missing key becomes a new list.
    pub fn push(
        &self,
        key: &str,
        elems: Vec<Value>,
        side: Side,
        require_exists: bool,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();

        match data.get_mut(key) {
            None => {
                if require_exists {
                    return Err(StoreError::NoSuchList {
                        key: key.to_string(),
                    });
                }
                data.insert(key.to_string(), Value::List(elems));
                Ok(())
            }
            Some(Value::List(list)) => {
                match side {
                    Side::Left => {
                        let mut next = elems;
                        next.append(list);
                        *list = next;
                    }
                    Side::Right => list.extend(elems),
                }
                Ok(())
            }
            Some(_) => Err(StoreError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    /// Remove and return one element from the list at `key`.
    pub fn pop(&self, key: &str, side: Side) -> Result<Value, StoreError> {
        let mut data = self.data.lock().unwrap();
        let list = list_mut(&mut data, key)?;
        if list.is_empty() {
            return Err(StoreError::IndexOutOfRange { index: 0, len: 0 });
        }
        Ok(match side {
            Side::Left => list.remove(0),
            Side::Right => list.pop().unwrap(),
        })
    }
}

fn list_ref<'a>(data: &'a HashMap<String, Value>, key: &str) -> Result<&'a Vec<Value>, StoreError> {
    match data.get(key) {
        Some(Value::List(list)) => Ok(list),
        _ => Err(StoreError::WrongType {
            key: key.to_string(),
        }),
    }
}

fn list_mut<'a>(
    data: &'a mut HashMap<String, Value>,
    key: &str,
) -> Result<&'a mut Vec<Value>, StoreError> {
    match data.get_mut(key) {
        Some(Value::List(list)) => Ok(list),
        _ => Err(StoreError::WrongType {
            key: key.to_string(),
        }),
    }
}

fn in_range(index: i64, len: usize) -> Result<usize, StoreError> {
    if index >= 0 && (index as usize) < len {
        Ok(index as usize)
    } else {
        Err(StoreError::IndexOutOfRange { index, len })
    }
}
