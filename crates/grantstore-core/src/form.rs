//! Order-preserving form data with strict query-string round-tripping.
//!
//! Stored requests keep their original form body as a URL-encoded string.
//! Key insertion order and duplicate values within a key must survive the
//! encode/decode round trip, so the mapping is backed by an insertion-ordered
//! map rather than a hash map.

use indexmap::IndexMap;
use url::form_urlencoded;

use crate::error::{StoreError, StoreResult};

/// Form values from an OAuth2 request, as a key to ordered-values multimap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: IndexMap<String, Vec<String>>,
}

impl FormData {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a key, preserving insertion order.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// All values stored under a key, in insertion order.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the form holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over keys and their value lists in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Encode the form as a URL query string.
    ///
    /// Keys appear in insertion order; duplicate values for a key appear as
    /// repeated pairs, so `{"a": ["1", "2"], "b": ["x"]}` encodes to
    /// `a=1&a=2&b=x`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.entries {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    /// Parse a URL query string back into a form.
    ///
    /// The empty string parses to an empty form. Parsing is strict: an
    /// incomplete or non-hex percent escape, or a component that does not
    /// decode to valid UTF-8, fails the whole parse.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if any component is undecodable.
    pub fn parse(input: &str) -> StoreResult<Self> {
        let mut form = Self::new();
        for pair in input.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            form.append(decode_component(key)?, decode_component(value)?);
        }
        Ok(form)
    }
}

/// Decode one percent-encoded form component ('+' means space).
fn decode_component(raw: &str) -> StoreResult<String> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' => {
                let hi = bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16));
                let lo = bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16));
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(StoreError::malformed(
                        "form",
                        format!("invalid percent escape in '{raw}'"),
                    ));
                };
                decoded.push((hi * 16 + lo) as u8);
                i += 3;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(decoded)
        .map_err(|_| StoreError::malformed("form", format!("invalid UTF-8 in '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_preserves_order_and_duplicates() {
        let mut form = FormData::new();
        form.append("a", "1");
        form.append("a", "2");
        form.append("b", "x");

        assert_eq!(form.encode(), "a=1&a=2&b=x");
    }

    #[test]
    fn test_parse_round_trip() {
        let mut form = FormData::new();
        form.append("grant_type", "authorization_code");
        form.append("redirect_uri", "https://example.com/cb?state=1");
        form.append("scope", "openid profile");

        let parsed = FormData::parse(&form.encode()).unwrap();
        assert_eq!(parsed, form);
    }

    #[test]
    fn test_parse_repeated_keys() {
        let form = FormData::parse("a=1&a=2&b=x").unwrap();
        assert_eq!(form.get("a"), Some(["1".to_string(), "2".to_string()].as_slice()));
        assert_eq!(form.get("b"), Some(["x".to_string()].as_slice()));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn test_parse_empty_string() {
        let form = FormData::parse("").unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let form = FormData::parse("q=hello+world").unwrap();
        assert_eq!(form.get("q"), Some(["hello world".to_string()].as_slice()));
    }

    #[test]
    fn test_value_free_key() {
        let form = FormData::parse("flag").unwrap();
        assert_eq!(form.get("flag"), Some([String::new()].as_slice()));
    }

    #[test]
    fn test_invalid_percent_escape_is_malformed() {
        let err = FormData::parse("a=%zz").unwrap_err();
        assert!(err.is_malformed());

        let err = FormData::parse("a=%4").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        // 0xE9 alone is not valid UTF-8.
        let err = FormData::parse("a=%e9").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_encode_escapes_reserved_characters() {
        let mut form = FormData::new();
        form.append("redirect", "https://example.com/cb?a=b&c=d");

        let encoded = form.encode();
        assert!(!encoded.contains("?a"));
        assert_eq!(FormData::parse(&encoded).unwrap(), form);
    }
}
