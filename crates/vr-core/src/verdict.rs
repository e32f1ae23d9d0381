//! # Verdict
//!
//! The fake / not-fake / equal label is never stored. It is derived from a
//! [`VoteSummary`] every time a news item is read.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VerityError;
use crate::models::VoteSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "not fake")]
    NotFake,
    #[serde(rename = "fake")]
    Fake,
    #[serde(rename = "equal")]
    Equal,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::NotFake => "not fake",
            Verdict::Fake => "fake",
            Verdict::Equal => "equal",
        })
    }
}

/// More real votes means not fake, more fake votes means fake.
/// A tie, including 0-0, is `Equal`.
pub fn derive_verdict(summary: VoteSummary) -> Verdict {
    match summary.real.cmp(&summary.fake) {
        Ordering::Greater => Verdict::NotFake,
        Ordering::Less => Verdict::Fake,
        Ordering::Equal => Verdict::Equal,
    }
}

/// Listing filter over the verdict; `All` passes everything through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Verdict),
}

impl StatusFilter {
    pub fn matches(self, verdict: Verdict) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == verdict,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = VerityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "fake" => Ok(StatusFilter::Only(Verdict::Fake)),
            "not fake" | "not-fake" | "notfake" => Ok(StatusFilter::Only(Verdict::NotFake)),
            "equal" => Ok(StatusFilter::Only(Verdict::Equal)),
            other => Err(VerityError::Validation(format!("unknown status filter '{other}'"))),
        }
    }
}
