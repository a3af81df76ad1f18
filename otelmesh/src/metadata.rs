// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! Request metadata carried alongside an RPC call.
//!
//! [`Metadata`] is the key/value bag a transport attaches to one in-flight
//! request. Trace headers are ferried through it; everything else in it is the
//! transport's business. Keys are matched case-insensitively, so
//! `Traceparent` and `traceparent` address the same entry.

use std::borrow::Cow;
use std::collections::HashMap;

/// A mutable mapping from string key to a single string value, attached to one
/// request for its lifetime.
///
/// Keys are normalized to lowercase on write, and lookups normalize the same
/// way, giving the case-insensitive behavior header-like metadata is expected
/// to have. Each request gets its own `Metadata` instance; carriers are never
/// shared between concurrent requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Metadata(HashMap<String, String>);

impl Metadata {
    /// Returns an empty metadata carrier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an empty metadata carrier with space for at least `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(HashMap::with_capacity(capacity))
    }

    /// Returns the value associated with `key`, matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(normalize(key).as_ref()).map(String::as_str)
    }

    /// Returns the value associated with `key`, or `""` when the key is
    /// absent. Absent and present-but-empty are indistinguishable here; use
    /// [`get`](Self::get) when the difference matters.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Writes `value` under `key`, overwriting any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let mut key = key.into();
        if key.bytes().any(|b| b.is_ascii_uppercase()) {
            key.make_ascii_lowercase();
        }
        self.0.insert(key, value.into());
    }

    /// Removes `key` from the carrier, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(normalize(key).as_ref())
    }

    /// Whether `key` has an associated value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(normalize(key).as_ref())
    }

    /// The number of entries in the carrier.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the carrier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all `(key, value)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.set(key, value);
        }
        metadata
    }
}

fn normalize(key: &str) -> Cow<'_, str> {
    if key.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(key.to_ascii_lowercase())
    } else {
        Cow::Borrowed(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut metadata = Metadata::new();
        metadata.set("Traceparent", "00-abc");
        assert_eq!(metadata.get("traceparent"), Some("00-abc"));
        assert_eq!(metadata.get("TRACEPARENT"), Some("00-abc"));
        assert!(metadata.contains_key("TraceParent"));
    }

    #[test]
    fn set_overwrites_previous_value() {
        let mut metadata = Metadata::new();
        metadata.set("traceparent", "first");
        metadata.set("TRACEPARENT", "second");
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("traceparent"), Some("second"));
    }

    #[test]
    fn empty_carrier_reads_empty_string_for_every_key() {
        let metadata = Metadata::new();
        assert_eq!(metadata.get("traceparent"), None);
        assert_eq!(metadata.get_or_empty("traceparent"), "");
        assert_eq!(metadata.get_or_empty("tracestate"), "");
        assert!(metadata.is_empty());
    }

    #[test]
    fn remove_returns_the_stored_value() {
        let mut metadata: Metadata = [("x-request-id", "42")].into_iter().collect();
        assert_eq!(metadata.remove("X-Request-Id"), Some("42".to_string()));
        assert_eq!(metadata.remove("x-request-id"), None);
    }
}
