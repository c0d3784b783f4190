//! Canonical lookup identity.
//!
//! Two call sites asking the same question must share one network
//! operation, so a lookup's identity is its endpoint path plus its query
//! parameters sorted by key then value. Argument order at the call site
//! never splits the cache.

use std::fmt;

/// Canonical identity of a remote lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature {
    path: String,
    params: Vec<(String, String)>,
}

impl RequestSignature {
    pub fn new<I, K, V>(path: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        params.sort();
        Self {
            path: path.to_string(),
            params,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?", self.path)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}
