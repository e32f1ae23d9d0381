//! # Comment Normalizer
//!
//! The single seam that absorbs backend comment shape drift. Nothing here
//! fails: missing or malformed fields degrade to defaults.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{Comment, Vote};
use crate::wire::{parse_time, RawComment};

/// Author shown when a comment arrives without one.
pub const ANONYMOUS: &str = "Anonymous";

/// Normalizes against the current clock.
pub fn normalize_comment(raw: RawComment) -> Comment {
    normalize_comment_at(raw, Utc::now())
}

/// Field resolution:
/// - author: `username`, then legacy `user`, then [`ANONYMOUS`] (blank counts as absent)
/// - vote: exactly `"real"` or `"fake"`, anything else becomes `Fake`
/// - time: RFC 3339 if parseable, else `now`
pub fn normalize_comment_at(raw: RawComment, now: DateTime<Utc>) -> Comment {
    let vote = match raw.vote.as_deref().and_then(Vote::parse) {
        Some(vote) => vote,
        None => {
            debug!(comment_id = ?raw.id, raw_vote = ?raw.vote, "unrecognized vote, counting as fake");
            Vote::Fake
        }
    };

    Comment {
        id: raw.id.unwrap_or(0),
        author: display_name(raw.username.filter(|n| !n.trim().is_empty()).or(raw.user)),
        text: raw.text.unwrap_or_default(),
        image: raw.image,
        time: raw.time.as_deref().and_then(parse_time).unwrap_or(now),
        vote,
    }
}

pub fn normalize_comments(raws: impl IntoIterator<Item = RawComment>) -> Vec<Comment> {
    let now = Utc::now();
    raws.into_iter().map(|raw| normalize_comment_at(raw, now)).collect()
}

/// `name` if it has visible content, otherwise [`ANONYMOUS`].
pub fn display_name(name: Option<String>) -> String {
    name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| ANONYMOUS.to_string())
}
