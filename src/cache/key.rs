//! Composite cache keys.
//!
//! A logical key is a `(namespace, key, tags)` triple. It is serialized as
//!
//! ```text
//! <prefix>:<namespace>:<key>:<tag1>=<val1>&<tag2>=<val2>
//! ```
//!
//! Tags are kept sorted by key, so the same logical key always maps to the
//! same physical key regardless of the order tags were added in.

use std::collections::BTreeMap;

use super::error::{CacheError, Result};
use crate::constants::{KEY_DELIMITER, RESERVED_TAG_CHARS, TAG_ASSIGN, TAG_SEPARATOR};

/// Ordered tag set qualifying a cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Creates an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag, replacing any previous value for `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a tag in place, replacing any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    /// Looks up a tag value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates tags in serialization order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Checks that no tag key or value contains `=` or `&`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTag`] for the first offending tag.
    pub fn validate(&self) -> Result<()> {
        let reserved = |s: &str| s.contains(RESERVED_TAG_CHARS);
        match self.iter().find(|(k, v)| reserved(k) || reserved(v)) {
            Some((k, v)) => Err(CacheError::invalid_tag(k, v)),
            None => Ok(()),
        }
    }

    /// Serializes the tags as `k1=v1&k2=v2`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTag`] if any tag contains a reserved
    /// character.
    pub fn serialize(&self) -> Result<String> {
        self.validate()?;

        let mut out = String::new();
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                out.push(TAG_SEPARATOR);
            }
            out.push_str(k);
            out.push(TAG_ASSIGN);
            out.push_str(v);
        }
        Ok(out)
    }
}

impl<K, V> FromIterator<(K, V)> for Tags
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (k, v) in iter {
            tags.insert(k, v);
        }
        tags
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Tags
where
    K: Into<String>,
    V: ToString,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Logical cache key: namespace, key, and qualifying tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub key: String,
    pub tags: Tags,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, tags: Tags) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            tags,
        }
    }

    /// Formats the physical key under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTag`] if any tag contains `=` or `&`.
    pub fn format(&self, prefix: &str) -> Result<String> {
        format_key(prefix, &self.namespace, &self.key, &self.tags)
    }
}

/// Formats a physical key from its parts.
///
/// # Errors
///
/// Returns [`CacheError::InvalidTag`] if any tag contains `=` or `&`.
pub fn format_key(prefix: &str, namespace: &str, key: &str, tags: &Tags) -> Result<String> {
    let tags = tags.serialize()?;
    let d = KEY_DELIMITER;
    Ok(format!("{prefix}{d}{namespace}{d}{key}{d}{tags}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_with_tags() {
        let tags = Tags::new().with("a", "b").with("c", 4);
        assert_eq!(
            format_key("orion", "ns", "key", &tags).unwrap(),
            "orion:ns:key:a=b&c=4"
        );
    }

    #[test]
    fn test_format_without_tags() {
        assert_eq!(
            format_key("prefix", "namespace", "key", &Tags::new()).unwrap(),
            "prefix:namespace:key:"
        );
    }

    #[test]
    fn test_tag_order_does_not_matter() {
        let forward = Tags::new().with("a", 1).with("b", 2).with("c", 3);
        let backward = Tags::new().with("c", 3).with("b", 2).with("a", 1);
        assert_eq!(
            format_key("p", "n", "k", &forward).unwrap(),
            format_key("p", "n", "k", &backward).unwrap()
        );
    }

    #[test]
    fn test_tags_from_array() {
        let tags = Tags::from([("lat", "1.5"), ("lon", "2.5")]);
        assert_eq!(tags.get("lat"), Some("1.5"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_insert_replaces_value() {
        let tags = Tags::new().with("a", "1").with("a", "2");
        assert_eq!(tags.serialize().unwrap(), "a=2");
    }

    #[test]
    fn test_rejects_reserved_in_value() {
        let tags = Tags::new().with("a", "=");
        let err = format_key("p", "n", "k", &tags).unwrap_err();
        assert!(matches!(err, CacheError::InvalidTag { .. }));
    }

    #[test]
    fn test_rejects_reserved_in_key() {
        assert!(Tags::new().with("a&b", "c").validate().is_err());
        assert!(Tags::new().with("a=b", "c").validate().is_err());
        assert!(Tags::new().with("a", "x&y").validate().is_err());
    }

    #[test]
    fn test_cache_key_format_matches_free_function() {
        let key = CacheKey::new("ns", "key", Tags::from([("a", "b")]));
        assert_eq!(key.format("orion").unwrap(), "orion:ns:key:a=b");
    }

    fn tag_text() -> impl Strategy<Value = String> {
        "[a-z0-9._-]{1,8}"
    }

    fn tags_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec((tag_text(), tag_text()), 0..6)
    }

    proptest! {
        /// Formatting the same triple twice yields the same string.
        #[test]
        fn format_is_deterministic(
            ns in "[a-z]{1,8}",
            key in "[a-z0-9]{1,8}",
            pairs in tags_strategy(),
        ) {
            let tags: Tags = pairs.iter().cloned().collect();
            let reversed: Tags = pairs.iter().rev().cloned().collect();
            // Later duplicates win on insert, so only compare when keys are unique.
            let distinct: std::collections::HashSet<_> = pairs.iter().map(|(k, _)| k).collect();
            let unique = distinct.len() == pairs.len();

            let a = format_key("p", &ns, &key, &tags).unwrap();
            let b = format_key("p", &ns, &key, &tags).unwrap();
            prop_assert_eq!(&a, &b);
            if unique {
                prop_assert_eq!(a, format_key("p", &ns, &key, &reversed).unwrap());
            }
        }

        /// Distinct triples over the allowed character set format differently.
        #[test]
        fn format_is_injective(
            ns1 in "[a-z]{1,6}", key1 in "[a-z]{1,6}", tags1 in tags_strategy(),
            ns2 in "[a-z]{1,6}", key2 in "[a-z]{1,6}", tags2 in tags_strategy(),
        ) {
            let t1: Tags = tags1.into_iter().collect();
            let t2: Tags = tags2.into_iter().collect();
            let k1 = CacheKey::new(ns1, key1, t1);
            let k2 = CacheKey::new(ns2, key2, t2);

            let f1 = k1.format("p").unwrap();
            let f2 = k2.format("p").unwrap();
            prop_assert_eq!(k1 == k2, f1 == f2);
        }

        /// Any tag containing a reserved character is rejected.
        #[test]
        fn reserved_characters_rejected(
            head in "[a-z]{0,4}",
            tail in "[a-z]{0,4}",
            reserved in prop::sample::select(vec!['=', '&']),
            in_key in any::<bool>(),
        ) {
            let poisoned = format!("{head}{reserved}{tail}");
            let tags = if in_key {
                Tags::new().with(poisoned, "v")
            } else {
                Tags::new().with("k", poisoned)
            };
            prop_assert!(format_key("p", "n", "k", &tags).is_err());
        }
    }
}
