//! Visitor client abstraction: the host-provided key-value view of a visitor's
//! cookies, plus the HTTP and in-memory implementations.

use std::collections::HashMap;

use crate::cookie::read_named_cookie;

/// Key under which a client exposes the raw `Cookie` request header.
pub const COOKIE_HEADER_KEY: &str = "cookie";

/// Max-Age used for `CookieScope::Infinite` (400 days, the browser cap).
pub const INFINITE_MAX_AGE_SECS: u64 = 400 * 24 * 60 * 60;

/// How long a value written through the client persists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CookieScope {
    /// Current page only; rendered as a session cookie over HTTP.
    Page,
    #[default]
    Session,
    Infinite,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub scope: CookieScope,
}

impl SetOptions {
    pub fn infinite() -> Self {
        Self {
            scope: CookieScope::Infinite,
        }
    }
}

/// Per-visitor capability handed to event handlers by the host.
pub trait EventClient {
    /// Read a stored value, or the raw cookie header for [`COOKIE_HEADER_KEY`].
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str, options: SetOptions);
}

/// Client backed by an HTTP request's `Cookie` header.
///
/// Writes are visible to later reads on the same client and are collected as
/// `Set-Cookie` header values for the response.
#[derive(Debug, Default)]
pub struct HttpCookieClient {
    header: String,
    written: Vec<(String, String, SetOptions)>,
}

impl HttpCookieClient {
    pub fn new(cookie_header: Option<&str>) -> Self {
        Self {
            header: cookie_header.unwrap_or_default().to_string(),
            written: Vec::new(),
        }
    }

    /// `Set-Cookie` values for every write, last write per name wins.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        let mut latest: Vec<&(String, String, SetOptions)> = Vec::new();
        for entry in self.written.iter().rev() {
            if !latest.iter().any(|seen| seen.0 == entry.0) {
                latest.push(entry);
            }
        }
        latest
            .into_iter()
            .rev()
            .map(|(name, value, options)| render_set_cookie(name, value, *options))
            .collect()
    }
}

impl EventClient for HttpCookieClient {
    fn get(&self, key: &str) -> Option<String> {
        if key == COOKIE_HEADER_KEY {
            return (!self.header.is_empty()).then(|| self.header.clone());
        }
        if let Some((_, value, _)) = self.written.iter().rev().find(|(name, _, _)| name == key) {
            return Some(value.clone());
        }
        read_named_cookie(&self.header, key).map(str::to_string)
    }

    fn set(&mut self, key: &str, value: &str, options: SetOptions) {
        self.written
            .push((key.to_string(), value.to_string(), options));
    }
}

fn render_set_cookie(name: &str, value: &str, options: SetOptions) -> String {
    match options.scope {
        CookieScope::Infinite => format!(
            "{}={}; Path=/; Max-Age={}; SameSite=Lax",
            name, value, INFINITE_MAX_AGE_SECS
        ),
        CookieScope::Page | CookieScope::Session => {
            format!("{}={}; Path=/; SameSite=Lax", name, value)
        }
    }
}

/// In-memory client that records every write.
#[derive(Debug, Default, Clone)]
pub struct MemoryClient {
    values: HashMap<String, String>,
    writes: Vec<(String, String, SetOptions)>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn writes(&self) -> &[(String, String, SetOptions)] {
        &self.writes
    }
}

impl EventClient for MemoryClient {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str, options: SetOptions) {
        self.values.insert(key.to_string(), value.to_string());
        self.writes
            .push((key.to_string(), value.to_string(), options));
    }
}
