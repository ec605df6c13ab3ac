use uuid::Uuid;

use crate::models::UserRow;
use crate::{Database, Result, StoreError, next_id};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;

/// `^[A-Za-z0-9_]{3,20}$`
pub fn is_valid_username(username: &str) -> bool {
    (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username.len())
        && username.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl Database {
    /// Create a user admitted by `invite_token` and log them in.
    ///
    /// Checks run in order: username shape, invitation existence, username
    /// uniqueness. The new user and the invitation's used flag are saved
    /// together.
    pub fn create_account(&self, username: &str, invite_token: &str, now: i64) -> Result<UserRow> {
        if !is_valid_username(username) {
            return Err(StoreError::InvalidInput(format!(
                "Username must be {}-{} characters (letters, numbers, underscore only)",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            )));
        }

        let session_token = Uuid::new_v4().to_string();

        self.with_snapshot_mut(|snapshot| {
            if snapshot.find_invite(invite_token).is_none() {
                return Err(StoreError::InvitationInvalid);
            }
            if snapshot.users.iter().any(|u| u.username == username) {
                return Err(StoreError::UsernameTaken);
            }

            let user = UserRow {
                id: next_id(snapshot.users.iter().map(|u| u.id)),
                username: username.to_string(),
                invite_token: invite_token.to_string(),
                created_at: now,
                session_token: Some(session_token),
            };
            snapshot.users.push(user.clone());
            snapshot.mark_invite_used(invite_token, now);

            Ok(user)
        })
    }

    pub fn verify_session(&self, session_token: &str) -> Result<UserRow> {
        self.with_snapshot(|snapshot| {
            snapshot
                .users
                .iter()
                .find(|u| u.session_token.as_deref() == Some(session_token))
                .cloned()
                .ok_or(StoreError::Unauthenticated)
        })
    }

    /// Log out whoever holds `session_token`. No match is not an error.
    pub fn clear_session(&self, session_token: &str) -> Result<()> {
        self.edit(|snapshot| {
            let holder = snapshot
                .users
                .iter_mut()
                .find(|u| u.session_token.as_deref() == Some(session_token));
            match holder {
                Some(user) => {
                    user.session_token = None;
                    Ok(((), true))
                }
                None => Ok(((), false)),
            }
        })
    }

    pub fn user_count(&self) -> Result<usize> {
        self.with_snapshot(|snapshot| Ok(snapshot.users.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_invite() -> (Database, String) {
        let db = Database::in_memory();
        let token = db.create_invite(0).unwrap();
        (db, token)
    }

    #[test]
    fn username_rules() {
        let longest = "x".repeat(20);
        let too_long = "x".repeat(21);
        for ok in ["abc", "op_7", "A_B_C", longest.as_str(), "___"] {
            assert!(is_valid_username(ok), "{ok:?} should be accepted");
        }
        for bad in ["ab", "", "has space", "dash-name", "émile", too_long.as_str()] {
            assert!(!is_valid_username(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn signup_assigns_sequential_ids_and_sessions() {
        let (db, invite) = db_with_invite();

        let first = db.create_account("op_7", &invite, 100).unwrap();
        let second = db.create_account("op_8", &invite, 200).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, 100);
        assert_eq!(first.invite_token, invite);
        assert!(first.session_token.is_some());
        assert_ne!(first.session_token, second.session_token);
    }

    #[test]
    fn signup_marks_invite_used_but_keeps_it_valid() {
        let (db, invite) = db_with_invite();
        db.create_account("op_7", &invite, 100).unwrap();

        let row = db.validate_invite(&invite).unwrap();
        assert!(row.used);
        assert_eq!(row.used_at, Some(100));
    }

    #[test]
    fn short_username_creates_nothing() {
        let (db, invite) = db_with_invite();

        let err = db.create_account("ab", &invite, 0).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(db.user_count().unwrap(), 0);
        assert!(!db.validate_invite(&invite).unwrap().used);
    }

    #[test]
    fn unknown_invite_is_rejected() {
        let db = Database::in_memory();
        assert_eq!(
            db.create_account("op_7", "missing", 0),
            Err(StoreError::InvitationInvalid)
        );
        assert_eq!(db.user_count().unwrap(), 0);
    }

    #[test]
    fn duplicate_username_is_rejected_once_taken() {
        let (db, invite) = db_with_invite();

        db.create_account("op_7", &invite, 0).unwrap();
        assert_eq!(db.create_account("op_7", &invite, 1), Err(StoreError::UsernameTaken));
        assert_eq!(db.user_count().unwrap(), 1);

        // Case matters: usernames compare exactly.
        db.create_account("OP_7", &invite, 2).unwrap();
        assert_eq!(db.user_count().unwrap(), 2);
    }

    #[test]
    fn invalid_username_wins_over_unknown_invite() {
        let db = Database::in_memory();
        let err = db.create_account("no!", "missing", 0).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn session_lifecycle() {
        let (db, invite) = db_with_invite();
        let user = db.create_account("op_7", &invite, 0).unwrap();
        let token = user.session_token.clone().unwrap();

        assert_eq!(db.verify_session(&token).unwrap().id, user.id);

        db.clear_session(&token).unwrap();
        assert_eq!(db.verify_session(&token), Err(StoreError::Unauthenticated));

        // Clearing again is harmless.
        db.clear_session(&token).unwrap();
    }

    #[test]
    fn unknown_session_is_unauthenticated() {
        let db = Database::in_memory();
        assert_eq!(db.verify_session("whatever"), Err(StoreError::Unauthenticated));
    }
}
