use crate::models::{FeedPost, PostRow};
use crate::snapshot::Snapshot;
use crate::{Database, Result, StoreError, next_id};

/// Lifetime of a post: 24 hours.
pub const POST_TTL_MS: i64 = 24 * 60 * 60 * 1000;
pub const MAX_POST_CHARS: usize = 500;
/// Most posts returned by a single feed read.
pub const FEED_LIMIT: usize = 100;

impl Database {
    /// Store a post for `user_id`. The text is trimmed before it is saved;
    /// the length limit applies to the text as submitted.
    pub fn create_post(&self, user_id: u64, content: &str, now: i64) -> Result<FeedPost> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidInput("Post content required".into()));
        }
        if content.chars().count() > MAX_POST_CHARS {
            return Err(StoreError::InvalidInput(format!(
                "Post must be {} characters or less",
                MAX_POST_CHARS
            )));
        }

        self.with_snapshot_mut(|snapshot| {
            let username = snapshot
                .username_of(user_id)
                .ok_or(StoreError::NotFound)?
                .to_string();

            let post = PostRow {
                id: next_id(snapshot.posts.iter().map(|p| p.id)),
                user_id,
                content: trimmed.to_string(),
                created_at: now,
                expires_at: now + POST_TTL_MS,
            };
            snapshot.posts.push(post.clone());

            Ok(joined(post, username))
        })
    }

    /// Newest-first feed of posts still alive at `now`.
    pub fn list_active(&self, now: i64) -> Result<Vec<FeedPost>> {
        self.with_snapshot(|snapshot| {
            let mut feed: Vec<FeedPost> = snapshot
                .posts
                .iter()
                .filter(|p| p.expires_at > now)
                .map(|p| {
                    let username = snapshot.username_of(p.user_id).unwrap_or("unknown").to_string();
                    joined(p.clone(), username)
                })
                .collect();

            feed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            feed.truncate(FEED_LIMIT);
            Ok(feed)
        })
    }

    /// Remove a post on behalf of its author. Existence is checked before
    /// ownership.
    pub fn delete_post(&self, post_id: u64, requester_id: u64) -> Result<()> {
        self.with_snapshot_mut(|snapshot| {
            let idx = snapshot
                .posts
                .iter()
                .position(|p| p.id == post_id)
                .ok_or(StoreError::NotFound)?;

            if snapshot.posts[idx].user_id != requester_id {
                return Err(StoreError::Forbidden);
            }

            snapshot.posts.remove(idx);
            Ok(())
        })
    }

    /// Drop every post whose `expires_at` is before `now`. Returns how many
    /// were removed; the snapshot is only saved when that is non-zero.
    pub fn sweep_expired(&self, now: i64) -> Result<usize> {
        self.edit(|snapshot| {
            let before = snapshot.posts.len();
            snapshot.posts.retain(|p| p.expires_at >= now);
            let removed = before - snapshot.posts.len();
            Ok((removed, removed > 0))
        })
    }

    pub fn active_post_count(&self, now: i64) -> Result<usize> {
        self.with_snapshot(|snapshot| Ok(snapshot.posts.iter().filter(|p| p.expires_at > now).count()))
    }
}

impl Snapshot {
    fn username_of(&self, user_id: u64) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.as_str())
    }
}

fn joined(post: PostRow, username: String) -> FeedPost {
    FeedPost {
        id: post.id,
        user_id: post.user_id,
        username,
        content: post.content,
        created_at: post.created_at,
        expires_at: post.expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRow;

    const T0: i64 = 1_700_000_000_000;

    fn db_with_users() -> (Database, u64, u64) {
        let db = Database::in_memory();
        let invite = db.create_invite(T0).unwrap();
        let alice = db.create_account("alice", &invite, T0).unwrap().id;
        let bob = db.create_account("bob", &invite, T0).unwrap().id;
        (db, alice, bob)
    }

    #[test]
    fn post_expires_exactly_one_day_later() {
        let (db, alice, _) = db_with_users();
        for offset in [0, 1, 999, 123_456] {
            let post = db.create_post(alice, "hello", T0 + offset).unwrap();
            assert_eq!(post.expires_at - post.created_at, 86_400_000);
            assert_eq!(post.created_at, T0 + offset);
        }
    }

    #[test]
    fn content_is_trimmed_and_joined_with_author() {
        let (db, alice, _) = db_with_users();
        let post = db.create_post(alice, "  hello  ", T0).unwrap();
        assert_eq!(post.content, "hello");
        assert_eq!(post.username, "alice");
        assert_eq!(post.id, 1);
    }

    #[test]
    fn rejects_blank_and_oversized_content() {
        let (db, alice, _) = db_with_users();

        for blank in ["", "   ", "\n\t"] {
            assert!(matches!(
                db.create_post(alice, blank, T0),
                Err(StoreError::InvalidInput(_))
            ));
        }

        let at_limit = "é".repeat(MAX_POST_CHARS);
        assert!(db.create_post(alice, &at_limit, T0).is_ok());

        let over = "a".repeat(MAX_POST_CHARS + 1);
        assert!(matches!(
            db.create_post(alice, &over, T0),
            Err(StoreError::InvalidInput(_))
        ));
        assert_eq!(db.active_post_count(T0).unwrap(), 1);
    }

    #[test]
    fn unknown_author_is_not_found() {
        let db = Database::in_memory();
        assert_eq!(db.create_post(42, "hi", T0), Err(StoreError::NotFound));
    }

    #[test]
    fn feed_is_newest_first_and_excludes_expired() {
        let (db, alice, bob) = db_with_users();
        db.create_post(alice, "old", T0).unwrap();
        db.create_post(bob, "mid", T0 + 10).unwrap();
        db.create_post(alice, "new", T0 + 20).unwrap();

        let feed = db.list_active(T0 + 30).unwrap();
        let contents: Vec<&str> = feed.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, ["new", "mid", "old"]);
        assert_eq!(feed[1].username, "bob");

        // At exactly expires_at the oldest post is no longer listed.
        let feed = db.list_active(T0 + POST_TTL_MS).unwrap();
        assert!(feed.iter().all(|p| p.expires_at > T0 + POST_TTL_MS));
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn feed_breaks_timestamp_ties_by_id() {
        let (db, alice, _) = db_with_users();
        db.create_post(alice, "first", T0).unwrap();
        db.create_post(alice, "second", T0).unwrap();

        let feed = db.list_active(T0).unwrap();
        assert_eq!(feed[0].content, "second");
        assert_eq!(feed[1].content, "first");
    }

    #[test]
    fn feed_is_capped() {
        let (db, alice, _) = db_with_users();
        for i in 0..(FEED_LIMIT as i64 + 5) {
            db.create_post(alice, "spam", T0 + i).unwrap();
        }

        let feed = db.list_active(T0).unwrap();
        assert_eq!(feed.len(), FEED_LIMIT);
        assert_eq!(feed[0].created_at, T0 + FEED_LIMIT as i64 + 4);
        assert_eq!(db.active_post_count(T0).unwrap(), FEED_LIMIT + 5);
    }

    #[test]
    fn orphaned_posts_show_unknown_author() {
        let db = Database::in_memory();
        db.with_snapshot_mut(|s| {
            s.users.push(UserRow {
                id: 1,
                username: "temp".into(),
                invite_token: "t".into(),
                created_at: T0,
                session_token: None,
            });
            Ok(())
        })
        .unwrap();
        db.create_post(1, "hi", T0).unwrap();
        db.with_snapshot_mut(|s| {
            s.users.clear();
            Ok(())
        })
        .unwrap();

        assert_eq!(db.list_active(T0).unwrap()[0].username, "unknown");
    }

    #[test]
    fn owner_can_delete() {
        let (db, alice, _) = db_with_users();
        let post = db.create_post(alice, "bye", T0).unwrap();

        db.delete_post(post.id, alice).unwrap();
        assert!(db.list_active(T0).unwrap().is_empty());
        assert_eq!(db.delete_post(post.id, alice), Err(StoreError::NotFound));
    }

    #[test]
    fn non_owner_cannot_delete() {
        let (db, alice, bob) = db_with_users();
        let post = db.create_post(alice, "mine", T0).unwrap();

        assert_eq!(db.delete_post(post.id, bob), Err(StoreError::Forbidden));
        assert_eq!(db.list_active(T0).unwrap().len(), 1);
    }

    #[test]
    fn missing_post_is_reported_before_ownership() {
        let (db, _, bob) = db_with_users();
        assert_eq!(db.delete_post(99, bob), Err(StoreError::NotFound));
    }

    #[test]
    fn sweep_is_idempotent() {
        let (db, alice, _) = db_with_users();
        db.create_post(alice, "a", T0).unwrap();
        db.create_post(alice, "b", T0 + 5).unwrap();
        db.create_post(alice, "c", T0 + POST_TTL_MS).unwrap();

        let t = T0 + POST_TTL_MS + 1;
        assert_eq!(db.sweep_expired(t).unwrap(), 1);
        assert_eq!(db.sweep_expired(t).unwrap(), 0);
        assert_eq!(db.active_post_count(t).unwrap(), 2);
    }

    #[test]
    fn sweep_keeps_posts_expiring_exactly_now() {
        let (db, alice, _) = db_with_users();
        let post = db.create_post(alice, "edge", T0).unwrap();

        assert_eq!(db.sweep_expired(post.expires_at).unwrap(), 0);
        assert_eq!(db.sweep_expired(post.expires_at + 1).unwrap(), 1);
    }

    #[test]
    fn ids_continue_after_deletion() {
        let (db, alice, _) = db_with_users();
        let a = db.create_post(alice, "a", T0).unwrap();
        let b = db.create_post(alice, "b", T0).unwrap();
        db.delete_post(a.id, alice).unwrap();

        let c = db.create_post(alice, "c", T0).unwrap();
        assert_eq!(c.id, b.id + 1);
    }
}
