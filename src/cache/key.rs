//! Cache key derivation
//!
//! A `CacheKey` is the logical identity of a cached query result. Keys are
//! either raw strings (`"batch:123"`) or built from a namespace plus named
//! query parameters, in which case the parameters are canonicalized so that
//! argument order never changes the key.

use sha2::{Digest, Sha256};
use std::fmt;

/// Maximum number of characters of the readable slug kept in a file name
const SLUG_MAX_LEN: usize = 48;

/// Number of hex digits of the key digest appended to the file name
pub(crate) const DIGEST_PREFIX_LEN: usize = 16;

/// Deterministic identifier for a cached query result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from a raw string, used verbatim
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds a key from a namespace and a set of named parameters
    ///
    /// Parameters are sorted by name (then value) before rendering, and
    /// the separator characters `?`, `&`, `=` and `%` are escaped inside
    /// names and values, so two parameter sets produce the same key only
    /// if they are equal as multisets.
    ///
    /// # Example
    /// ```
    /// use nomad_api::CacheKey;
    ///
    /// let a = CacheKey::from_params("entries", [("entry_type", "Sample"), ("max", "10")]);
    /// let b = CacheKey::from_params("entries", [("max", "10"), ("entry_type", "Sample")]);
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "entries?entry_type=Sample&max=10");
    /// ```
    pub fn from_params<I, K, V>(namespace: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (escape(k.as_ref()), escape(v.as_ref())))
            .collect();
        pairs.sort();

        let mut raw = escape(namespace);
        for (i, (name, value)) in pairs.iter().enumerate() {
            raw.push(if i == 0 { '?' } else { '&' });
            raw.push_str(name);
            raw.push('=');
            raw.push_str(value);
        }
        Self(raw)
    }

    /// Returns the raw key string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex-encoded SHA-256 digest of the raw key
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }

    /// File stem used for this key's artifact: `<slug>-<digest prefix>`
    ///
    /// The slug keeps cache directories browsable; the digest prefix is
    /// what makes the mapping injective.
    pub fn file_stem(&self) -> String {
        let digest = self.digest();
        format!("{}-{}", slugify(&self.0), &digest[..DIGEST_PREFIX_LEN])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Escapes the characters that carry structure in a parameterized key
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            '?' => out.push_str("%3F"),
            _ => out.push(c),
        }
    }
    out
}

/// Reduces a key to a filesystem-safe, bounded slug
fn slugify(raw: &str) -> String {
    let slug: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .take(SLUG_MAX_LEN)
        .collect();

    if slug.is_empty() {
        "key".to_string()
    } else {
        slug
    }
}
