//! # Wire Shapes
//!
//! The server's JSON is loose: fields go missing, comment authors arrive as
//! `username` on one API version and `user` on another, and removal is
//! flagged two different ways. These types accept all of it and hand the
//! store canonical [`NewsItem`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{Lifecycle, NewsId, NewsItem, VoteSummary};
use crate::normalize::normalize_comments;

/// A comment exactly as some backend version sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawComment {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: Option<String>,
    /// Older shape of `username`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vote: Option<String>,
}

impl RawComment {
    /// Never fails: anything that is not an object becomes an empty comment.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// A news item as the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNews {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub short_detail: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub full_detail: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reporter: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_summary")]
    pub vote_summary: Option<VoteSummary>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<RawComment>>,
    /// Server-computed verdict or `"removed"`; only the removal marker is honored.
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub removed: Option<bool>,
}

impl RawNews {
    pub fn is_removed(&self) -> bool {
        self.removed == Some(true)
            || self.status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("removed"))
    }

    /// Canonical item, or `None` when the payload carries no identifier.
    /// Missing comments and vote counts default to empty and zero.
    pub fn into_news(self) -> Option<NewsItem> {
        let id = NewsId(self.id?);
        Some(self.into_news_with_id(id))
    }

    /// Like [`RawNews::into_news`], falling back to `id` when the payload has none.
    pub fn into_news_or(self, id: NewsId) -> NewsItem {
        let id = self.id.map(NewsId).unwrap_or(id);
        self.into_news_with_id(id)
    }

    fn into_news_with_id(self, id: NewsId) -> NewsItem {
        let lifecycle = if self.is_removed() { Lifecycle::Removed } else { Lifecycle::Active };
        NewsItem {
            id,
            topic: self.topic.unwrap_or_default(),
            short_detail: self.short_detail.unwrap_or_default(),
            full_detail: self.full_detail.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            reporter: self.reporter.unwrap_or_default(),
            date_time: self.date_time.as_deref().and_then(parse_time),
            vote_summary: self.vote_summary.unwrap_or_default(),
            comments: normalize_comments(self.comments.unwrap_or_default()),
            lifecycle,
        }
    }

    /// Overwrites the fields this payload actually carries onto `existing`.
    /// Absent fields leave the existing values untouched.
    pub fn overlay(self, existing: &mut NewsItem) {
        if self.is_removed() {
            existing.mark_removed();
        }
        if let Some(topic) = self.topic {
            existing.topic = topic;
        }
        if let Some(short) = self.short_detail {
            existing.short_detail = short;
        }
        if let Some(full) = self.full_detail {
            existing.full_detail = full;
        }
        if let Some(image) = self.image {
            existing.image = image;
        }
        if let Some(reporter) = self.reporter {
            existing.reporter = reporter;
        }
        if let Some(at) = self.date_time.as_deref().and_then(parse_time) {
            existing.date_time = Some(at);
        }
        if let Some(summary) = self.vote_summary {
            existing.vote_summary = summary;
        }
        if let Some(comments) = self.comments {
            existing.comments = normalize_comments(comments);
        }
    }
}

/// Accepts a Spring page (`{"content": [...]}`) or a bare array.
/// Any other shape yields no comments.
pub fn comments_from_page(body: Value) -> Vec<RawComment> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut page) => match page.remove("content") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items.into_iter().map(RawComment::from_value).collect()
}

pub(crate) fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok().map(|t| t.with_timezone(&Utc))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Value::deserialize(d)?.as_bool())
}

fn lenient_summary<'de, D: Deserializer<'de>>(d: D) -> Result<Option<VoteSummary>, D::Error> {
    Ok(serde_json::from_value(Value::deserialize(d)?).ok())
}

fn lenient_comments<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<RawComment>>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => Some(items.into_iter().map(RawComment::from_value).collect()),
        _ => None,
    })
}
