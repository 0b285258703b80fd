//! Ordered member map for WDDX structs.
//!
//! This module provides [`WddxMap`], a wrapper around [`IndexMap`] that keeps struct
//! members in insertion order. Encoding writes `var` elements in that order and decoding
//! rebuilds the map in document order.
//!
//! Member names are unique: inserting an existing name replaces its value in place,
//! which is how duplicate `var` names in a document resolve (last write wins).
//!
//! ## Examples
//!
//! ```rust
//! use serde_wddx::{Value, WddxMap};
//!
//! let mut map = WddxMap::new();
//! map.insert("name".to_string(), Value::from("Alice"));
//! map.insert("age".to_string(), Value::from(30));
//!
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! ```

use crate::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

/// An ordered map of member names to WDDX values.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{Value, WddxMap};
///
/// let mut map = WddxMap::new();
/// map.insert("first".to_string(), Value::from(1));
/// map.insert("second".to_string(), Value::from(2));
///
/// // Iteration maintains insertion order
/// let keys: Vec<_> = map.keys().cloned().collect();
/// assert_eq!(keys, vec!["first", "second"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WddxMap(IndexMap<String, Value>);

impl WddxMap {
    /// Creates an empty `WddxMap`.
    #[must_use]
    pub fn new() -> Self {
        WddxMap(IndexMap::new())
    }

    /// Creates an empty `WddxMap` with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        WddxMap(IndexMap::with_capacity(capacity))
    }

    /// Inserts a member.
    ///
    /// If the map already contained this name, the value is replaced in its original
    /// position and the old value is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wddx::{Value, WddxMap};
    ///
    /// let mut map = WddxMap::new();
    /// map.insert("a".to_string(), Value::from(1));
    /// map.insert("b".to_string(), Value::from(2));
    /// assert_eq!(map.insert("a".to_string(), Value::from(3)), Some(Value::from(1)));
    ///
    /// let keys: Vec<_> = map.keys().map(String::as_str).collect();
    /// assert_eq!(keys, ["a", "b"]);
    /// ```
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    /// Returns a reference to the value of the named member.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a mutable reference to the value of the named member.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Removes a member, keeping the order of the remaining members.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Returns `true` if the map has a member with this name.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the member names, in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Returns an iterator over the member values, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    /// Returns an iterator over the members, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl From<HashMap<String, Value>> for WddxMap {
    fn from(map: HashMap<String, Value>) -> Self {
        WddxMap(map.into_iter().collect())
    }
}

impl From<WddxMap> for HashMap<String, Value> {
    fn from(map: WddxMap) -> Self {
        map.0.into_iter().collect()
    }
}

impl IntoIterator for WddxMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a WddxMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for WddxMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        WddxMap(IndexMap::from_iter(iter))
    }
}
