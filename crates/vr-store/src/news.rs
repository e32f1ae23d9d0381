//! # News Reconciliation Store
//!
//! Holds three disjoint collections of news items and reconciles them with
//! the server:
//!
//! - `confirmed`: server-backed items, most recently created first
//! - `unsaved`: items created locally that the server has not seen
//! - `removed`: soft-deleted items kept for the administrative view
//!
//! Two error styles coexist on purpose. List reads (`fetch_all`,
//! `fetch_removed`) fail soft: they record the error, empty the collection
//! and return normally. Detail fetch, create and remove fail loud: they
//! record the error and hand it back to the caller.
//!
//! # Concurrency
//! State sits behind a mutex that is never held across an `.await`, so
//! actions interleave at network calls. Detail fetches carry a per-item
//! generation token and a response is only applied if no newer fetch for
//! the same item was issued meanwhile. `loading` is a plain flag: two
//! overlapping actions can clear it while one is still in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, error, info, warn};
use vr_core::{
    display_name, normalize_comments, Comment, CommentInput, CreateNewsPayload, NewComment, NewsDraft, NewsGateway,
    NewsId, NewsItem, NewsView, Notifier, PageRequest, Result, Severity, StatusFilter, Vote, VerityError,
    VoteSummary,
};

pub const FETCH_NEWS_FAILED: &str = "Failed to fetch news";
pub const FETCH_DETAILS_FAILED: &str = "Failed to fetch news details";
pub const CREATE_FAILED: &str = "Failed to create news";
pub const SUBMIT_FAILED: &str = "Failed to submit vote";
pub const REMOVE_FAILED: &str = "Failed to remove news";
pub const FETCH_REMOVED_FAILED: &str = "Failed to fetch removed news";

/// Temporary identifiers are drawn from one process-wide negative counter,
/// so they never repeat and never meet a server id (always positive).
static NEXT_TEMP_ID: AtomicI64 = AtomicI64::new(-1);

fn next_temp_id() -> NewsId {
    NewsId(NEXT_TEMP_ID.fetch_sub(1, Ordering::Relaxed))
}

/// Outcome of [`NewsStore::submit_comment`]; failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SubmitOutcome {
    fn ok() -> Self {
        Self { success: true, error: None }
    }

    fn failed(message: &str) -> Self {
        Self { success: false, error: Some(message.to_string()) }
    }
}

#[derive(Default)]
struct NewsState {
    confirmed: Vec<NewsItem>,
    unsaved: Vec<NewsItem>,
    removed: Vec<NewsItem>,
    current: Option<NewsItem>,
    loading: bool,
    error: Option<String>,
    /// Latest detail-fetch generation issued per item.
    detail_generations: HashMap<NewsId, u64>,
    next_generation: u64,
}

impl NewsState {
    fn combined(&self) -> impl Iterator<Item = &NewsItem> {
        self.confirmed.iter().chain(self.unsaved.iter())
    }

    fn issue_generation(&mut self, id: NewsId) -> u64 {
        self.next_generation += 1;
        self.detail_generations.insert(id, self.next_generation);
        self.next_generation
    }

    fn is_latest(&self, id: NewsId, generation: u64) -> bool {
        self.detail_generations.get(&id) == Some(&generation)
    }

    fn push_removed(&mut self, mut item: NewsItem) {
        if self.removed.iter().any(|n| n.id == item.id) {
            return;
        }
        item.mark_removed();
        self.removed.push(item);
    }
}

pub struct NewsStore {
    gateway: Arc<dyn NewsGateway>,
    notifier: Option<Arc<dyn Notifier>>,
    comment_page: PageRequest,
    state: Mutex<NewsState>,
}

impl NewsStore {
    pub fn new(gateway: Arc<dyn NewsGateway>) -> Self {
        Self { gateway, notifier: None, comment_page: PageRequest::default(), state: Mutex::new(NewsState::default()) }
    }

    /// Action outcomes are reported to `notifier` as well as recorded on the store.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Page requested when loading the comments of a detail view.
    pub fn with_comment_page(mut self, page: PageRequest) -> Self {
        self.comment_page = page;
        self
    }

    fn state(&self) -> MutexGuard<'_, NewsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, message: &str, severity: Severity) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(message, severity);
        }
    }

    // ===== Raw state =====

    pub fn confirmed(&self) -> Vec<NewsItem> {
        self.state().confirmed.clone()
    }

    pub fn unsaved(&self) -> Vec<NewsItem> {
        self.state().unsaved.clone()
    }

    pub fn removed(&self) -> Vec<NewsItem> {
        self.state().removed.clone()
    }

    /// Item under detailed view, if any.
    pub fn current(&self) -> Option<NewsItem> {
        self.state().current.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().error.clone()
    }

    // ===== Getters =====

    /// `confirmed` followed by `unsaved`, order preserved.
    pub fn combined(&self) -> Vec<NewsItem> {
        self.state().combined().cloned().collect()
    }

    /// Looks the item up across `confirmed` and `unsaved` and attaches its verdict.
    pub fn by_id(&self, id: NewsId) -> Option<NewsView> {
        self.state().combined().find(|n| n.id == id).cloned().map(NewsView::new)
    }

    /// Live items (nothing removed or tagged removed), each with its verdict,
    /// narrowed by `filter`.
    pub fn with_status(&self, filter: StatusFilter) -> Vec<NewsView> {
        let state = self.state();
        state
            .combined()
            .filter(|n| !n.is_removed() && !state.removed.iter().any(|r| r.id == n.id))
            .cloned()
            .map(NewsView::new)
            .filter(|view| filter.matches(view.verdict))
            .collect()
    }

    // ===== Actions =====

    /// Reloads the active list. Items the server flags as removed go to
    /// `removed` (once per id). Fails soft.
    pub async fn fetch_all(&self) {
        {
            let mut state = self.state();
            state.loading = true;
            state.error = None;
        }

        let result = self.gateway.list_news().await;

        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(raws) => {
                let mut active = Vec::with_capacity(raws.len());
                for raw in raws {
                    let removed = raw.is_removed();
                    let Some(item) = raw.into_news() else {
                        warn!("skipping news payload without an id");
                        continue;
                    };
                    if removed {
                        state.push_removed(item);
                    } else {
                        active.push(item);
                    }
                }
                debug!(active = active.len(), removed = state.removed.len(), "news list loaded");
                state.confirmed = active;
            }
            Err(e) => {
                warn!(error = %e, "fetching news failed");
                state.error = Some(FETCH_NEWS_FAILED.to_string());
                state.confirmed.clear();
            }
        }
    }

    /// Loads one item and then its comments. On success the item becomes
    /// `current` and replaces the matching `confirmed` entry; this is how
    /// confirmed entries receive their comment list. Fails loud.
    ///
    /// If a newer fetch for the same id was issued while this one was in
    /// flight, the result is returned to the caller but not applied.
    pub async fn fetch_by_id(&self, id: NewsId) -> Result<NewsItem> {
        let generation = {
            let mut state = self.state();
            state.loading = true;
            state.error = None;
            state.current = None;
            state.issue_generation(id)
        };

        let fetched = self.load_detail(id).await;

        let mut state = self.state();
        state.loading = false;
        if !state.is_latest(id, generation) {
            debug!(news_id = %id, generation, "discarding superseded detail response");
            return fetched;
        }

        match fetched {
            Ok(item) => {
                if let Some(slot) = state.confirmed.iter_mut().find(|n| n.id == id) {
                    *slot = item.clone();
                }
                state.current = Some(item.clone());
                Ok(item)
            }
            Err(e) => {
                error!(news_id = %id, error = %e, "fetching news details failed");
                state.error = Some(FETCH_DETAILS_FAILED.to_string());
                state.current = None;
                Err(e)
            }
        }
    }

    /// Comments are keyed by news id, so they are requested only once the item is known.
    async fn load_detail(&self, id: NewsId) -> Result<NewsItem> {
        let raw = self.gateway.get_news(id).await?;
        let comments = self.gateway.list_comments(id, self.comment_page).await?;
        let mut item = raw.into_news_or(id);
        item.comments = normalize_comments(comments);
        Ok(item)
    }

    /// Submits a new item. A returned id already in `confirmed` is merged in
    /// place; a new one is prepended. Without a usable entity in the
    /// response the whole list is reloaded instead. Fails loud.
    pub async fn create(&self, payload: CreateNewsPayload) -> Result<Option<NewsItem>> {
        self.state().error = None;

        let created = match self.gateway.create_news(&payload).await {
            Ok(created) => created,
            Err(e) => {
                error!(topic = %payload.topic, error = %e, "creating news failed");
                self.state().error = Some(CREATE_FAILED.to_string());
                self.notify(CREATE_FAILED, Severity::Error);
                return Err(e);
            }
        };

        let applied = match created {
            Some(raw) => match raw.id.map(NewsId) {
                Some(id) => {
                    let mut state = self.state();
                    if let Some(existing) = state.confirmed.iter_mut().find(|n| n.id == id) {
                        info!(news_id = %id, "server returned an existing id, merging");
                        raw.overlay(existing);
                        Some(existing.clone())
                    } else {
                        let item = raw.into_news_or(id);
                        state.confirmed.insert(0, item.clone());
                        Some(item)
                    }
                }
                None => None,
            },
            None => None,
        };

        if applied.is_none() {
            debug!("create returned no usable entity, reloading list");
            self.fetch_all().await;
        }
        self.notify("News created", Severity::Success);
        Ok(applied)
    }

    /// Posts a comment/vote and then re-fetches the parent so the summary
    /// comes from the server. Never returns an error.
    pub async fn submit_comment(&self, news_id: NewsId, input: CommentInput) -> SubmitOutcome {
        let body = NewComment::from_input(news_id, input);
        let result = match self.gateway.create_comment(&body).await {
            Ok(_) => self.fetch_by_id(news_id).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.notify("Vote submitted", Severity::Success);
                SubmitOutcome::ok()
            }
            Err(e) => {
                warn!(news_id = %news_id, error = %e, "submitting comment failed");
                self.notify(SUBMIT_FAILED, Severity::Error);
                SubmitOutcome::failed(SUBMIT_FAILED)
            }
        }
    }

    /// Keeps a draft locally under a fresh temporary id.
    pub fn add_unsaved(&self, draft: NewsDraft) -> NewsId {
        let id = next_temp_id();
        self.state().unsaved.push(draft.into_news(id));
        debug!(news_id = %id, "unsaved news added");
        id
    }

    /// Optimistic comment on an item the server has not confirmed: appends
    /// the comment and bumps the vote summary locally.
    ///
    /// Server-backed items are refused; their counts only change through
    /// [`NewsStore::submit_comment`].
    pub fn add_comment_local(
        &self,
        news_id: NewsId,
        author: &str,
        text: &str,
        image: Option<String>,
        vote: Vote,
    ) -> Result<Comment> {
        let mut state = self.state();
        if state.confirmed.iter().any(|n| n.id == news_id) {
            warn!(news_id = %news_id, "refusing local comment on a server-backed item");
            return Err(VerityError::Validation(format!(
                "news {news_id} is confirmed by the server; submit the comment instead"
            )));
        }
        let Some(item) = state.unsaved.iter_mut().find(|n| n.id == news_id) else {
            warn!(news_id = %news_id, "news item not found for local comment");
            return Err(VerityError::not_found("News", news_id));
        };

        let comment = Comment {
            id: item.next_comment_id(),
            author: display_name(Some(author.to_string())),
            text: text.to_string(),
            image: image.filter(|i| !i.trim().is_empty()),
            time: Utc::now(),
            vote,
        };
        item.comments.push(comment.clone());
        item.vote_summary.record(vote);
        Ok(comment)
    }

    /// Soft-deletes on the server, then moves the item from `confirmed` or
    /// `unsaved` into `removed`. A matching `current` is tagged, not cleared.
    /// Fails loud, preferring the server's own error message.
    pub async fn remove(&self, news_id: NewsId) -> Result<()> {
        self.state().error = None;

        if let Err(e) = self.gateway.remove_news(news_id).await {
            let message = e.server_message().unwrap_or(REMOVE_FAILED).to_string();
            error!(news_id = %news_id, error = %e, "removing news failed");
            self.notify(&message, Severity::Error);
            self.state().error = Some(message);
            return Err(e);
        }

        {
            let mut state = self.state();
            let found = state
                .confirmed
                .iter()
                .chain(state.unsaved.iter())
                .find(|n| n.id == news_id)
                .cloned();
            state.confirmed.retain(|n| n.id != news_id);
            state.unsaved.retain(|n| n.id != news_id);
            if let Some(item) = found {
                state.push_removed(item);
            }
            if let Some(current) = state.current.as_mut().filter(|c| c.id == news_id) {
                current.mark_removed();
            }
        }
        info!(news_id = %news_id, "news removed");
        self.notify("News removed", Severity::Success);
        Ok(())
    }

    /// Replaces `removed` with the administrative listing, tagging every
    /// entry removed whatever the server said. Fails soft.
    pub async fn fetch_removed(&self) {
        {
            let mut state = self.state();
            state.loading = true;
            state.error = None;
        }

        let result = self.gateway.list_removed_news().await;

        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(raws) => {
                state.removed = raws
                    .into_iter()
                    .filter_map(|raw| raw.into_news())
                    .map(|mut item| {
                        item.mark_removed();
                        item
                    })
                    .collect();
            }
            Err(e) => {
                warn!(error = %e, "fetching removed news failed");
                state.error = Some(FETCH_REMOVED_FAILED.to_string());
                state.removed.clear();
            }
        }
    }

    /// Server-side tally for one item. Read-only.
    pub async fn summary(&self, news_id: NewsId) -> Result<VoteSummary> {
        self.gateway.vote_summary(news_id).await
    }

    /// Administrative pass-through; local state is left alone.
    pub async fn delete_comment(&self, news_id: NewsId, comment_id: i64) -> Result<()> {
        self.gateway.delete_comment(news_id, comment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use serde_json::json;
    use tokio::sync::oneshot;
    use vr_core::{DisplayStatus, MockNewsGateway, MockNotifier, RawComment, RawNews, Verdict};

    fn raw(value: serde_json::Value) -> RawNews {
        serde_json::from_value(value).unwrap()
    }

    fn news(id: i64, real: u64, fake: u64) -> RawNews {
        raw(json!({"id": id, "topic": format!("topic {id}"), "voteSummary": {"real": real, "fake": fake}}))
    }

    fn store(gateway: MockNewsGateway) -> NewsStore {
        NewsStore::new(Arc::new(gateway))
    }

    fn payload(topic: &str) -> CreateNewsPayload {
        CreateNewsPayload { topic: topic.into(), reporter: "rep".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn fetch_all_partitions_removed_items_without_duplicates() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().times(2).returning(|| {
            Ok(vec![
                news(1, 0, 0),
                raw(json!({"id": 2, "status": "removed"})),
                raw(json!({"id": 3, "removed": true})),
                news(4, 1, 0),
            ])
        });
        let store = store(gateway);

        store.fetch_all().await;
        store.fetch_all().await;

        let confirmed: Vec<_> = store.confirmed().iter().map(|n| n.id.0).collect();
        assert_eq!(confirmed, vec![1, 4]);
        let removed: Vec<_> = store.removed().iter().map(|n| n.id.0).collect();
        assert_eq!(removed, vec![2, 3]);
        assert!(store.removed().iter().all(NewsItem::is_removed));
        assert!(!store.is_loading());
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn fetch_all_fails_soft() {
        let mut gateway = MockNewsGateway::new();
        let mut first = true;
        gateway.expect_list_news().returning(move || {
            if std::mem::take(&mut first) {
                Ok(vec![news(1, 0, 0)])
            } else {
                Err(VerityError::Transport("connection refused".into()))
            }
        });
        let store = store(gateway);

        store.fetch_all().await;
        assert_eq!(store.confirmed().len(), 1);

        store.fetch_all().await;
        assert!(store.confirmed().is_empty());
        assert_eq!(store.last_error().as_deref(), Some(FETCH_NEWS_FAILED));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn fetch_by_id_attaches_normalized_comments_and_replaces_confirmed() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(3, 0, 0), news(8, 0, 0)]));
        gateway.expect_get_news().with(eq(NewsId(3))).returning(|_| Ok(news(3, 1, 1)));
        gateway.expect_list_comments().returning(|_, _| {
            Ok(vec![
                RawComment::from_value(json!({"id": 1, "user": "bob", "vote": "real"})),
                RawComment::from_value(json!({"id": 2, "username": "", "vote": "nonsense"})),
            ])
        });
        let store = store(gateway);
        store.fetch_all().await;

        let item = store.fetch_by_id(NewsId(3)).await.unwrap();
        assert_eq!(item.comments.len(), 2);
        assert_eq!(item.comments[0].author, "bob");
        assert_eq!(item.comments[1].author, "Anonymous");
        assert_eq!(item.comments[1].vote, Vote::Fake);

        assert_eq!(store.current(), Some(item.clone()));
        assert_eq!(store.confirmed()[0], item);
        assert_eq!(store.confirmed().len(), 2);
    }

    #[tokio::test]
    async fn fetch_by_id_does_not_insert_unknown_items_into_confirmed() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_get_news().returning(|id| Ok(news(id.0, 0, 0)));
        gateway.expect_list_comments().returning(|_, _| Ok(vec![]));
        let store = store(gateway);

        store.fetch_by_id(NewsId(11)).await.unwrap();
        assert!(store.confirmed().is_empty());
        assert_eq!(store.current().map(|n| n.id), Some(NewsId(11)));
    }

    #[tokio::test]
    async fn fetch_by_id_clears_current_when_comments_fail() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_get_news().returning(|id| Ok(news(id.0, 0, 0)));
        let mut comments_ok = true;
        gateway.expect_list_comments().returning(move |_, _| {
            if std::mem::take(&mut comments_ok) {
                Ok(vec![])
            } else {
                Err(VerityError::Status { status: 500, message: None })
            }
        });
        let store = store(gateway);

        store.fetch_by_id(NewsId(3)).await.unwrap();
        assert!(store.current().is_some());

        let err = store.fetch_by_id(NewsId(3)).await.unwrap_err();
        assert!(matches!(err, VerityError::Status { status: 500, .. }));
        assert_eq!(store.current(), None);
        assert_eq!(store.last_error().as_deref(), Some(FETCH_DETAILS_FAILED));
    }

    #[tokio::test]
    async fn comments_are_requested_only_after_the_item_is_found() {
        let mut gateway = MockNewsGateway::new();
        gateway
            .expect_get_news()
            .returning(|id| Err(VerityError::Status { status: 404, message: Some(format!("News not found with id: {id}")) }));
        gateway.expect_list_comments().never();
        let store = store(gateway);

        assert!(store.fetch_by_id(NewsId(99)).await.is_err());
        assert_eq!(store.current(), None);
    }

    #[tokio::test]
    async fn create_with_colliding_id_overwrites_in_place() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(9, 0, 0), news(5, 2, 0)]));
        gateway
            .expect_create_news()
            .withf(|p| p.topic == "X")
            .returning(|_| Ok(Some(raw(json!({"id": 5, "topic": "X", "reporter": "rep"})))));
        let store = store(gateway);
        store.fetch_all().await;

        let created = store.create(payload("X")).await.unwrap().unwrap();
        assert_eq!(created.topic, "X");

        let confirmed = store.confirmed();
        assert_eq!(confirmed.len(), 2);
        assert_eq!(confirmed[1].id, NewsId(5));
        assert_eq!(confirmed[1].topic, "X");
        // omitted by the server, so kept
        assert_eq!(confirmed[1].vote_summary, VoteSummary::new(2, 0));
    }

    #[tokio::test]
    async fn create_prepends_new_items_with_defaults() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(1, 0, 0)]));
        gateway.expect_create_news().returning(|_| Ok(Some(raw(json!({"id": 2, "topic": "fresh"})))));
        let store = store(gateway);
        store.fetch_all().await;

        store.create(payload("fresh")).await.unwrap();

        let confirmed = store.confirmed();
        assert_eq!(confirmed[0].id, NewsId(2));
        assert!(confirmed[0].comments.is_empty());
        assert_eq!(confirmed[0].total_votes(), 0);
        assert_eq!(confirmed[0].vote_summary, VoteSummary::default());
    }

    #[tokio::test]
    async fn create_without_entity_reloads_everything() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_create_news().returning(|_| Ok(None));
        gateway.expect_list_news().times(1).returning(|| Ok(vec![news(1, 0, 0), news(2, 0, 0)]));
        let store = store(gateway);

        assert_eq!(store.create(payload("x")).await.unwrap(), None);
        assert_eq!(store.confirmed().len(), 2);
    }

    #[tokio::test]
    async fn create_failure_is_recorded_and_raised() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_create_news().returning(|_| Err(VerityError::Transport("timeout".into())));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|msg, sev| msg == CREATE_FAILED && *sev == Severity::Error)
            .times(1)
            .returning(|_, _| 0);
        let store = NewsStore::new(Arc::new(gateway)).with_notifier(Arc::new(notifier));

        assert!(store.create(payload("x")).await.is_err());
        assert_eq!(store.last_error().as_deref(), Some(CREATE_FAILED));
    }

    #[tokio::test]
    async fn submit_comment_posts_then_refetches() {
        let mut gateway = MockNewsGateway::new();
        gateway
            .expect_create_comment()
            .withf(|c| c.news_id == NewsId(4) && c.vote == Vote::Real && c.image.is_none())
            .times(1)
            .returning(|_| Ok(None));
        gateway.expect_get_news().times(1).returning(|_| Ok(news(4, 1, 0)));
        gateway.expect_list_comments().returning(|_, _| Ok(vec![]));
        let store = store(gateway);

        let input = CommentInput { username: "ann".into(), text: "legit".into(), image: Some(String::new()), vote: Vote::Real };
        let outcome = store.submit_comment(NewsId(4), input).await;

        assert_eq!(outcome, SubmitOutcome { success: true, error: None });
        assert_eq!(store.current().unwrap().vote_summary, VoteSummary::new(1, 0));
    }

    #[tokio::test]
    async fn submit_comment_reports_failure_as_data() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_create_comment().returning(|_| Err(VerityError::Status { status: 400, message: None }));
        gateway.expect_get_news().never();
        let store = store(gateway);

        let input = CommentInput { username: "ann".into(), text: String::new(), image: None, vote: Vote::Fake };
        let outcome = store.submit_comment(NewsId(4), input).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some(SUBMIT_FAILED));
    }

    #[tokio::test]
    async fn add_unsaved_ids_are_negative_and_unique() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(1, 0, 0), news(2, 0, 0)]));
        let store = store(gateway);
        store.fetch_all().await;

        let mut seen: Vec<NewsId> = store.combined().iter().map(|n| n.id).collect();
        for _ in 0..50 {
            let id = store.add_unsaved(NewsDraft { topic: "draft".into(), ..Default::default() });
            assert!(id.is_temporary());
            assert!(!seen.contains(&id));
            seen.push(id);
        }
        assert_eq!(store.unsaved().len(), 50);
        assert_eq!(store.combined().len(), store.confirmed().len() + store.unsaved().len());
    }

    #[test]
    fn local_comments_keep_total_in_step_with_summary() {
        let store = store(MockNewsGateway::new());
        let id = store.add_unsaved(NewsDraft::default());

        let first = store.add_comment_local(id, "", "hmm", None, Vote::Fake).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.author, "Anonymous");
        let second = store.add_comment_local(id, "zoe", "sure", Some("pic.png".into()), Vote::Real).unwrap();
        assert_eq!(second.id, 2);
        store.add_comment_local(id, "zoe", "again", None, Vote::Real).unwrap();

        let view = store.by_id(id).unwrap();
        assert_eq!(view.news.vote_summary, VoteSummary::new(2, 1));
        assert_eq!(view.news.total_votes(), view.news.vote_summary.real + view.news.vote_summary.fake);
        assert_eq!(view.verdict, Verdict::NotFake);
        assert_eq!(view.news.comments.len(), 3);
    }

    #[tokio::test]
    async fn local_comments_are_refused_for_confirmed_items() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(1, 0, 0)]));
        let store = store(gateway);
        store.fetch_all().await;

        let err = store.add_comment_local(NewsId(1), "a", "b", None, Vote::Real).unwrap_err();
        assert!(matches!(err, VerityError::Validation(_)));
        assert!(matches!(
            store.add_comment_local(NewsId(-999_999), "a", "b", None, Vote::Real),
            Err(VerityError::NotFound(..))
        ));
        assert_eq!(store.by_id(NewsId(1)).unwrap().news.total_votes(), 0);
    }

    #[tokio::test]
    async fn remove_moves_unsaved_item_to_removed() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(1, 0, 0)]));
        gateway.expect_remove_news().times(1).returning(|_| Ok(()));
        let store = store(gateway);
        store.fetch_all().await;
        let temp = store.add_unsaved(NewsDraft { topic: "local".into(), ..Default::default() });

        store.remove(temp).await.unwrap();

        assert!(store.unsaved().is_empty());
        assert_eq!(store.confirmed().len(), 1);
        let removed = store.removed();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, temp);
        assert!(removed[0].is_removed());
        assert!(store.by_id(temp).is_none());
    }

    #[tokio::test]
    async fn remove_tags_current_without_clearing_it() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(7, 3, 1)]));
        gateway.expect_get_news().returning(|_| Ok(news(7, 3, 1)));
        gateway.expect_list_comments().returning(|_, _| Ok(vec![]));
        gateway.expect_remove_news().returning(|_| Ok(()));
        let store = store(gateway);
        store.fetch_all().await;
        store.fetch_by_id(NewsId(7)).await.unwrap();

        store.remove(NewsId(7)).await.unwrap();
        store.remove(NewsId(7)).await.unwrap();

        let current = store.current().unwrap();
        assert!(current.is_removed());
        assert_eq!(current.topic, "topic 7");
        assert_eq!(NewsView::new(current).display_status(), DisplayStatus::Removed);
        assert_eq!(store.removed().len(), 1);
        assert!(store.confirmed().is_empty());
    }

    #[tokio::test]
    async fn remove_failure_prefers_server_message() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(1, 0, 0)]));
        let mut calls = 0;
        gateway.expect_remove_news().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(VerityError::Status { status: 403, message: Some("Access denied".into()) })
            } else {
                Err(VerityError::Transport("reset".into()))
            }
        });
        let store = store(gateway);
        store.fetch_all().await;

        assert!(store.remove(NewsId(1)).await.is_err());
        assert_eq!(store.last_error().as_deref(), Some("Access denied"));
        assert!(store.remove(NewsId(1)).await.is_err());
        assert_eq!(store.last_error().as_deref(), Some(REMOVE_FAILED));
        assert_eq!(store.confirmed().len(), 1);
        assert!(store.removed().is_empty());
    }

    #[tokio::test]
    async fn fetch_removed_replaces_and_tags_everything() {
        let mut gateway = MockNewsGateway::new();
        let mut first = true;
        gateway.expect_list_removed_news().returning(move || {
            if std::mem::take(&mut first) {
                Ok(vec![news(1, 0, 0), raw(json!({"id": 2, "status": "fake"}))])
            } else {
                Err(VerityError::Status { status: 403, message: None })
            }
        });
        let store = store(gateway);

        store.fetch_removed().await;
        let removed = store.removed();
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(NewsItem::is_removed));

        store.fetch_removed().await;
        assert!(store.removed().is_empty());
        assert_eq!(store.last_error().as_deref(), Some(FETCH_REMOVED_FAILED));
    }

    #[tokio::test]
    async fn with_status_hides_removed_and_filters_by_verdict() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_list_news().returning(|| Ok(vec![news(1, 3, 0), news(2, 0, 2), news(3, 1, 1), news(4, 0, 0)]));
        gateway.expect_list_removed_news().returning(|| Ok(vec![news(4, 0, 0)]));
        let store = store(gateway);
        store.fetch_all().await;
        store.fetch_removed().await;
        store.add_unsaved(NewsDraft { vote_summary: VoteSummary::new(0, 1), ..Default::default() });

        let all = store.with_status(StatusFilter::All);
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|v| v.news.id != NewsId(4)));
        assert!(all.iter().all(|v| v.verdict == v.news.vote_summary.verdict()));

        let fake = store.with_status(StatusFilter::Only(Verdict::Fake));
        assert_eq!(fake.len(), 2);
        let ids: Vec<_> = store.with_status(StatusFilter::Only(Verdict::Equal)).iter().map(|v| v.news.id.0).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(store.with_status(StatusFilter::Only(Verdict::NotFake))[0].news.id, NewsId(1));
    }

    #[tokio::test]
    async fn by_id_recomputes_verdict_after_each_read() {
        let store = store(MockNewsGateway::new());
        let id = store.add_unsaved(NewsDraft::default());
        assert_eq!(store.by_id(id).unwrap().verdict, Verdict::Equal);
        store.add_comment_local(id, "a", "", None, Vote::Fake).unwrap();
        assert_eq!(store.by_id(id).unwrap().verdict, Verdict::Fake);
        assert!(store.by_id(NewsId(12345)).is_none());
    }

    #[tokio::test]
    async fn summary_and_comment_delete_pass_through() {
        let mut gateway = MockNewsGateway::new();
        gateway.expect_vote_summary().with(eq(NewsId(2))).returning(|_| Ok(VoteSummary::new(4, 5)));
        gateway.expect_delete_comment().with(eq(NewsId(2)), eq(10)).times(1).returning(|_, _| Ok(()));
        let store = store(gateway);

        assert_eq!(store.summary(NewsId(2)).await.unwrap(), VoteSummary::new(4, 5));
        store.delete_comment(NewsId(2), 10).await.unwrap();
        assert!(store.combined().is_empty());
    }

    /// Hands out `get_news` responses in call order, each gated on a oneshot.
    struct GatedGateway {
        pending: Mutex<Vec<oneshot::Receiver<RawNews>>>,
    }

    #[async_trait]
    impl NewsGateway for GatedGateway {
        async fn list_news(&self) -> Result<Vec<RawNews>> {
            Ok(vec![])
        }
        async fn get_news(&self, _id: NewsId) -> Result<RawNews> {
            let rx = self.pending.lock().unwrap().remove(0);
            rx.await.map_err(|e| VerityError::Transport(e.to_string()))
        }
        async fn list_removed_news(&self) -> Result<Vec<RawNews>> {
            Ok(vec![])
        }
        async fn create_news(&self, _payload: &CreateNewsPayload) -> Result<Option<RawNews>> {
            Ok(None)
        }
        async fn remove_news(&self, _id: NewsId) -> Result<()> {
            Ok(())
        }
        async fn list_comments(&self, _news_id: NewsId, _page: PageRequest) -> Result<Vec<RawComment>> {
            Ok(vec![])
        }
        async fn create_comment(&self, _comment: &NewComment) -> Result<Option<RawComment>> {
            Ok(None)
        }
        async fn delete_comment(&self, _news_id: NewsId, _comment_id: i64) -> Result<()> {
            Ok(())
        }
        async fn vote_summary(&self, _news_id: NewsId) -> Result<VoteSummary> {
            Ok(VoteSummary::default())
        }
    }

    #[tokio::test]
    async fn overlapping_detail_fetches_keep_the_latest_request() {
        let (older_tx, older_rx) = oneshot::channel();
        let (newer_tx, newer_rx) = oneshot::channel();
        let store = NewsStore::new(Arc::new(GatedGateway { pending: Mutex::new(vec![older_rx, newer_rx]) }));

        let (older, newer, ()) = tokio::join!(
            store.fetch_by_id(NewsId(3)),
            store.fetch_by_id(NewsId(3)),
            async {
                newer_tx.send(raw(json!({"id": 3, "topic": "newer"}))).unwrap();
                tokio::task::yield_now().await;
                older_tx.send(raw(json!({"id": 3, "topic": "older"}))).unwrap();
            }
        );

        // both callers still see their own response
        assert_eq!(older.unwrap().topic, "older");
        assert_eq!(newer.unwrap().topic, "newer");
        assert_eq!(store.current().unwrap().topic, "newer");
    }
}
