//! Request inputs the guard reads.

use std::collections::BTreeMap;

/// Lower-case name of the credentials header.
pub const AUTHORIZATION: &str = "authorization";

/// Case-insensitive header access.
///
/// Implementations receive lower-case names and return the first value, or
/// `None` when it is absent or not valid text.
pub trait HeaderLookup {
    /// First value of `name`.
    fn header(&self, name: &str) -> Option<&str>;
}

/// Minimal owned header map with case-insensitive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders(BTreeMap<String, String>);

impl RequestHeaders {
    /// Empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a header; the name is folded to lower case.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Builder form of `insert`.
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl HeaderLookup for RequestHeaders {
    fn header(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Everything a single guard decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardRequest<'a> {
    /// Request path without the query string.
    pub path: &'a str,
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// Raw branch-selector header value (untrimmed).
    pub branch_selector: Option<&'a str>,
}

impl<'a> GuardRequest<'a> {
    /// Request for `path` with no headers.
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            authorization: None,
            branch_selector: None,
        }
    }

    /// Attach an `Authorization` header value.
    pub fn with_authorization(mut self, authorization: &'a str) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Attach a branch-selector header value.
    pub fn with_branch_selector(mut self, branch: &'a str) -> Self {
        self.branch_selector = Some(branch);
        self
    }

    /// Pull the guard's inputs out of a header map.
    pub fn from_headers<H: HeaderLookup>(path: &'a str, headers: &'a H, branch_header: &str) -> Self {
        Self {
            path,
            authorization: headers.header(AUTHORIZATION),
            branch_selector: headers.header(branch_header),
        }
    }
}
