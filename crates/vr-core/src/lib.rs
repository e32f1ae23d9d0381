//! verity/crates/vr-core/src/lib.rs
//!
//! Domain model, wire shapes and port definitions for the verity
//! news-verification client.

pub mod error;
pub mod models;
pub mod normalize;
pub mod traits;
pub mod verdict;
pub mod wire;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use normalize::*;
pub use traits::*;
pub use verdict::*;
pub use wire::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn comment(id: i64, vote: Vote) -> Comment {
        Comment { id, author: ANONYMOUS.into(), text: String::new(), image: None, time: Utc::now(), vote }
    }

    #[test]
    fn summary_from_comments_counts_by_vote() {
        let comments = vec![comment(1, Vote::Real), comment(2, Vote::Fake), comment(3, Vote::Real)];
        let summary = VoteSummary::from_comments(&comments);
        assert_eq!(summary, VoteSummary::new(2, 1));
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.verdict(), Verdict::NotFake);
    }

    #[test]
    fn next_comment_id_is_one_past_max() {
        let mut news = NewsDraft::default().into_news(NewsId(-1));
        assert_eq!(news.next_comment_id(), 1);
        news.comments = vec![comment(4, Vote::Fake), comment(2, Vote::Real)];
        assert_eq!(news.next_comment_id(), 5);
    }

    #[test]
    fn removal_outranks_verdict_for_display() {
        let mut news = NewsDraft { vote_summary: VoteSummary::new(5, 0), ..Default::default() }.into_news(NewsId(1));
        assert_eq!(NewsView::new(news.clone()).display_status(), DisplayStatus::NotFake);
        news.mark_removed();
        let view = NewsView::new(news);
        assert_eq!(view.verdict, Verdict::NotFake);
        assert_eq!(view.display_status(), DisplayStatus::Removed);
    }

    #[test]
    fn new_comment_sends_blank_image_as_null() {
        let input = CommentInput { username: "u".into(), text: "t".into(), image: Some("".into()), vote: Vote::Real };
        let body = serde_json::to_value(NewComment::from_input(NewsId(3), input)).unwrap();
        assert_eq!(body, serde_json::json!({"username": "u", "text": "t", "image": null, "vote": "real", "newsId": 3}));
    }

    #[test]
    fn temporary_ids_are_negative() {
        assert!(NewsId(-3).is_temporary());
        assert!(!NewsId(3).is_temporary());
    }
}
