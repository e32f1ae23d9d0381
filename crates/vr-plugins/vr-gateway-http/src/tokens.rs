//! Bearer token sources.
//!
//! Tokens get stored sloppily (surrounding whitespace, left-over JSON
//! quotes), so every source runs its value through [`normalize_token`].

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use vr_core::TokenSource;

/// Trims the token and unwraps one pair of matching quotes.
/// Returns `None` when nothing usable is left.
pub fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|&q| trimmed.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)))
        .unwrap_or(trimmed);
    if unquoted.is_empty() || unquoted == "\"" || unquoted == "'" {
        return None;
    }
    Some(unquoted.to_string())
}

/// A token fixed at startup, e.g. from configuration.
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(secret: SecretString) -> Self {
        Self(secret)
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        normalize_token(self.0.expose_secret())
    }
}

/// Reads an environment variable on every request, so a token written
/// after startup is picked up.
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenSource for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var).ok().as_deref().and_then(normalize_token)
    }
}

/// First source with a usable token wins.
#[derive(Default)]
pub struct TokenChain {
    sources: Vec<Arc<dyn TokenSource>>,
}

impl TokenChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.sources.push(source);
        self
    }
}

impl TokenSource for TokenChain {
    fn token(&self) -> Option<String> {
        self.sources.iter().find_map(|s| s.token())
    }
}

/// Anonymous access.
pub struct NoToken;

impl TokenSource for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}
