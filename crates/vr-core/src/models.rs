//! # Domain Models
//!
//! These structs represent the entities a verity client reconciles:
//! news items, the comments that carry votes, and the outbound payloads.
//! Wire shapes as the server sends them live in [`crate::wire`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::verdict::{derive_verdict, Verdict};

/// Identifier of a news item.
///
/// The server hands out positive integers. Items that only exist locally
/// carry a negative identifier until the server confirms them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewsId(pub i64);

impl NewsId {
    pub fn is_temporary(self) -> bool {
        self.0 < 0
    }
}

impl From<i64> for NewsId {
    fn from(raw: i64) -> Self {
        NewsId(raw)
    }
}

impl fmt::Display for NewsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single ballot: the commenter thinks the news is real or fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Real,
    Fake,
}

impl Vote {
    /// Strict parse: only the exact lowercase words are accepted.
    pub fn parse(raw: &str) -> Option<Vote> {
        match raw {
            "real" => Some(Vote::Real),
            "fake" => Some(Vote::Fake),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vote::Real => "real",
            Vote::Fake => "fake",
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vote counts for one news item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteSummary {
    pub real: u64,
    pub fake: u64,
}

impl VoteSummary {
    pub fn new(real: u64, fake: u64) -> Self {
        Self { real, fake }
    }

    /// Always the sum of both counters; there is no separate total to drift.
    pub fn total(&self) -> u64 {
        self.real.saturating_add(self.fake)
    }

    pub fn record(&mut self, vote: Vote) {
        match vote {
            Vote::Real => self.real += 1,
            Vote::Fake => self.fake += 1,
        }
    }

    pub fn verdict(&self) -> Verdict {
        derive_verdict(*self)
    }

    /// Tally built purely from the votes carried by `comments`.
    pub fn from_comments(comments: &[Comment]) -> Self {
        comments.iter().fold(Self::default(), |mut acc, c| {
            acc.record(c.vote);
            acc
        })
    }
}

/// Whether a news item is live or soft-deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Active,
    Removed,
}

/// A canonical comment, produced by the normalizer from any backend shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique within the parent news item.
    pub id: i64,
    pub author: String,
    pub text: String,
    pub image: Option<String>,
    pub time: DateTime<Utc>,
    pub vote: Vote,
}

/// A news item as the store holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: NewsId,
    pub topic: String,
    pub short_detail: String,
    pub full_detail: String,
    pub image: String,
    pub reporter: String,
    pub date_time: Option<DateTime<Utc>>,
    pub vote_summary: VoteSummary,
    /// Chronological: insertion order is posting order.
    pub comments: Vec<Comment>,
    pub lifecycle: Lifecycle,
}

impl NewsItem {
    pub fn total_votes(&self) -> u64 {
        self.vote_summary.total()
    }

    pub fn is_removed(&self) -> bool {
        self.lifecycle == Lifecycle::Removed
    }

    pub fn mark_removed(&mut self) {
        self.lifecycle = Lifecycle::Removed;
    }

    /// Next comment identifier: one past the current maximum, or 1 when empty.
    pub fn next_comment_id(&self) -> i64 {
        self.comments.iter().map(|c| c.id).max().map_or(1, |max| max + 1)
    }
}

/// The content of a news item the user drafted locally, before it has an id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsDraft {
    pub topic: String,
    pub short_detail: String,
    pub full_detail: String,
    pub image: String,
    pub reporter: String,
    pub date_time: Option<DateTime<Utc>>,
    pub vote_summary: VoteSummary,
    pub comments: Vec<Comment>,
}

impl NewsDraft {
    pub fn into_news(self, id: NewsId) -> NewsItem {
        NewsItem {
            id,
            topic: self.topic,
            short_detail: self.short_detail,
            full_detail: self.full_detail,
            image: self.image,
            reporter: self.reporter,
            date_time: self.date_time,
            vote_summary: self.vote_summary,
            comments: self.comments,
            lifecycle: Lifecycle::Active,
        }
    }
}

/// A news item surfaced for reading, with its verdict computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsView {
    #[serde(flatten)]
    pub news: NewsItem,
    pub verdict: Verdict,
}

impl NewsView {
    pub fn new(news: NewsItem) -> Self {
        let verdict = news.vote_summary.verdict();
        Self { news, verdict }
    }

    /// What a reader should see: removal outranks the vote-derived verdict.
    pub fn display_status(&self) -> DisplayStatus {
        if self.news.is_removed() {
            DisplayStatus::Removed
        } else {
            self.verdict.into()
        }
    }
}

/// Verdict plus the out-of-band `removed` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayStatus {
    #[serde(rename = "not fake")]
    NotFake,
    #[serde(rename = "fake")]
    Fake,
    #[serde(rename = "equal")]
    Equal,
    #[serde(rename = "removed")]
    Removed,
}

impl From<Verdict> for DisplayStatus {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::NotFake => DisplayStatus::NotFake,
            Verdict::Fake => DisplayStatus::Fake,
            Verdict::Equal => DisplayStatus::Equal,
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayStatus::NotFake => "not fake",
            DisplayStatus::Fake => "fake",
            DisplayStatus::Equal => "equal",
            DisplayStatus::Removed => "removed",
        })
    }
}

/// Body of `POST /api/news`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNewsPayload {
    pub topic: String,
    pub short_detail: String,
    pub full_detail: String,
    pub image: String,
    pub reporter: String,
    /// ISO-8601; the server stamps "now" when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
}

/// What the user typed into the vote form.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentInput {
    pub username: String,
    pub text: String,
    pub image: Option<String>,
    pub vote: Vote,
}

/// Body of `POST /api/comments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub username: String,
    pub text: String,
    pub image: Option<String>,
    pub vote: Vote,
    pub news_id: NewsId,
}

impl NewComment {
    /// Empty image references are sent as `null`.
    pub fn from_input(news_id: NewsId, input: CommentInput) -> Self {
        Self {
            username: input.username,
            text: input.text,
            image: input.image.filter(|i| !i.trim().is_empty()),
            vote: input.vote,
            news_id,
        }
    }
}

/// Pagination for the comment listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 100 }
    }
}

/// Severity tag of a user-facing notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    #[default]
    Info,
}

/// A transient message for the user. Expiry is owned by the queue that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
}

/// A platform account as the administrative endpoints return it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// e.g. `ROLE_ADMIN`, `ROLE_MEMBER`, `ROLE_READER`
    #[serde(default)]
    pub roles: Vec<String>,
}
