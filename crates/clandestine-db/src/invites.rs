use uuid::Uuid;

use crate::models::InviteRow;
use crate::snapshot::Snapshot;
use crate::{Database, Result, StoreError};

impl Database {
    /// Issue a fresh invitation token.
    pub fn create_invite(&self, now: i64) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.with_snapshot_mut(|snapshot| {
            snapshot.invite_tokens.push(InviteRow {
                token: token.clone(),
                created_at: now,
                used: false,
                used_at: None,
            });
            Ok(())
        })?;
        Ok(token)
    }

    /// Invitations are reusable: a token stays valid after it has been used.
    pub fn validate_invite(&self, token: &str) -> Result<InviteRow> {
        self.with_snapshot(|snapshot| snapshot.find_invite(token).cloned().ok_or(StoreError::NotFound))
    }

    /// Record that `token` admitted someone. Unknown tokens are ignored.
    pub fn consume_invite(&self, token: &str, now: i64) -> Result<()> {
        self.edit(|snapshot| Ok(((), snapshot.mark_invite_used(token, now))))
    }
}

impl Snapshot {
    pub(crate) fn find_invite(&self, token: &str) -> Option<&InviteRow> {
        self.invite_tokens.iter().find(|i| i.token == token)
    }

    pub(crate) fn mark_invite_used(&mut self, token: &str, now: i64) -> bool {
        match self.invite_tokens.iter_mut().find(|i| i.token == token) {
            Some(invite) => {
                invite.used = true;
                invite.used_at = Some(now);
                true
            }
            None => false,
        }
    }
}
