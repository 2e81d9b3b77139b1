//! `SessionIndex`: the process-global ephemeral bot-provenance and
//! child↔parent maps, given explicit lifecycle rather than left as
//! module-global singletons (design note §9).

use cyrus_core::{CommentId, SessionId, UserId};
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

use crate::ttl::TtlSet;

const RECENT_BOT_COMMENT_TTL: Duration = Duration::from_secs(5 * 60);
const THREAD_REPLY_POSTED_TTL: Duration = Duration::from_secs(5 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Ephemeral, process-global bookkeeping that prevents bot-loop responses and
/// links child sessions back to their parent. Rebuilt lazily after a
/// restart — nothing here is persisted (spec.md invariants, §3).
pub struct SessionIndex {
    recent_bot_comment_ids: TtlSet<CommentId>,
    bot_parent_comment_ids: DashMap<CommentId, ()>,
    bot_user_ids: DashMap<UserId, ()>,
    child_to_parent: DashMap<SessionId, SessionId>,
    /// Guards against double-posting a thread reply within the 5-minute
    /// window spec.md §4.7.8 calls for.
    thread_reply_posted: TtlSet<SessionId>,
    /// Comments carrying a ⏳ "working on it" reaction not yet cleared
    /// (spec.md §4.7.1 step 4, the "Unresponded Tracker").
    unresponded: DashMap<CommentId, ()>,
    sweep_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutdown: std::sync::Arc<Notify>,
}

impl Default for SessionIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            recent_bot_comment_ids: TtlSet::new(RECENT_BOT_COMMENT_TTL),
            bot_parent_comment_ids: DashMap::new(),
            bot_user_ids: DashMap::new(),
            child_to_parent: DashMap::new(),
            thread_reply_posted: TtlSet::new(THREAD_REPLY_POSTED_TTL),
            unresponded: DashMap::new(),
            sweep_handle: std::sync::Mutex::new(None),
            shutdown: std::sync::Arc::new(Notify::new()),
        }
    }

    /// Spawn the background TTL sweeper. Idempotent — calling `start` twice
    /// replaces the previous task.
    pub fn start(self: &std::sync::Arc<Self>) {
        let this = std::sync::Arc::clone(self);
        let shutdown = std::sync::Arc::clone(&self.shutdown);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let a = this.recent_bot_comment_ids.sweep();
                        let b = this.thread_reply_posted.sweep();
                        if a + b > 0 {
                            tracing::debug!(evicted_bot_comments = a, evicted_thread_replies = b, "session index sweep");
                        }
                    }
                    () = shutdown.notified() => break,
                }
            }
        });
        *self.sweep_handle.lock().expect("sweep handle mutex poisoned") = Some(handle);
    }

    /// Stop the sweeper task, if running.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
        if let Some(handle) = self.sweep_handle.lock().expect("sweep handle mutex poisoned").take() {
            handle.abort();
        }
        info!("session index sweeper stopped");
    }

    // -- Bot-loop prevention (spec.md §4.7.10) --------------------------

    /// Record that `comment_id` (authored by `author_user_id`) was posted by
    /// us. Adds to both `recentBotCommentIds` and `botParentCommentIds`, and
    /// records the author as a bot user id.
    pub fn mark_bot_authored(&self, comment_id: &CommentId, author_user_id: &str) {
        self.recent_bot_comment_ids.insert(comment_id.clone());
        self.bot_parent_comment_ids.insert(comment_id.clone(), ());
        self.bot_user_ids.insert(UserId::from(author_user_id), ());
    }

    #[must_use]
    pub fn is_recent_bot_comment(&self, comment_id: &CommentId) -> bool {
        self.recent_bot_comment_ids.contains(comment_id)
    }

    #[must_use]
    pub fn is_bot_parent_comment(&self, comment_id: &CommentId) -> bool {
        self.bot_parent_comment_ids.contains_key(comment_id)
    }

    #[must_use]
    pub fn is_bot_user(&self, user_id: &str) -> bool {
        self.bot_user_ids.contains_key(&UserId::from(user_id))
    }

    /// Should-respond decision for a `Comment.create` event (spec.md §4.7.7).
    ///
    /// Respond iff the comment is not bot-authored/bot-flagged AND either
    /// it replies to a bot-authored parent, or its body mentions the bot.
    #[must_use]
    pub fn should_respond_to_comment(
        &self,
        comment_id: &CommentId,
        author_user_id: &str,
        bot_actor: bool,
        parent_id: Option<&CommentId>,
        body: &str,
    ) -> bool {
        if self.is_recent_bot_comment(comment_id) || self.is_bot_user(author_user_id) || bot_actor {
            return false;
        }
        let replies_to_bot = parent_id.is_some_and(|p| self.is_bot_parent_comment(p));
        let mentions_bot = body.contains("@cyrus") || body.contains("@bot");
        replies_to_bot || mentions_bot
    }

    // -- Child/parent linkage (spec.md §4.7.9) --------------------------

    pub fn link_child_to_parent(&self, child: SessionId, parent: SessionId) {
        self.child_to_parent.insert(child, parent);
    }

    #[must_use]
    pub fn parent_of(&self, child: &SessionId) -> Option<SessionId> {
        self.child_to_parent.get(child).map(|v| v.clone())
    }

    // -- Thread-reply dedup (spec.md §4.7.8) -----------------------------

    /// `true` if a thread reply was already posted for `session_id` within
    /// the dedup window.
    #[must_use]
    pub fn thread_reply_already_posted(&self, session_id: &SessionId) -> bool {
        self.thread_reply_posted.contains(session_id)
    }

    pub fn mark_thread_reply_posted(&self, session_id: SessionId) {
        self.thread_reply_posted.insert(session_id);
    }

    // -- Unresponded tracker (spec.md §4.7.1 step 4) ---------------------

    pub fn mark_unresponded(&self, comment_id: CommentId) {
        self.unresponded.insert(comment_id, ());
    }

    /// Clear `comment_id` from the Unresponded Tracker once it has been
    /// answered (its ⏳ reaction removed).
    pub fn clear_unresponded(&self, comment_id: &CommentId) {
        self.unresponded.remove(comment_id);
    }

    #[must_use]
    pub fn is_unresponded(&self, comment_id: &CommentId) -> bool {
        self.unresponded.contains_key(comment_id)
    }
}
