//! # vr-gateway-http
//!
//! HTTP adapter for the verity ports. Talks JSON to the news-verification
//! backend, attaches a bearer token when one is available and normalizes
//! the base URL so callers can configure it loosely.

pub mod client;
pub mod tokens;

pub use client::{normalize_base_url, HttpGateway, DEFAULT_TIMEOUT};
pub use tokens::{normalize_token, EnvToken, NoToken, StaticToken, TokenChain};
