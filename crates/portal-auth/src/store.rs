//! Session store: the published `{identity, role, status}` value.
//!
//! Every mutation goes through a single `send_if_modified` call while the
//! epoch lock is held, so mutations never interleave. Each identity-provider
//! event, sign-out and role write bumps the epoch. A role resolution carries
//! the epoch and identity it was started for and is dropped if either no
//! longer matches when it completes.

use crate::{Identity, Role, Session, SessionStatus};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// Identifies the event a role resolution was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTag {
    identity_id: String,
    epoch: u64,
}

impl ResolutionTag {
    pub fn identity_id(&self) -> &str {
        &self.identity_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

pub struct SessionStore {
    tx: watch::Sender<Session>,
    epoch: Mutex<u64>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::loading());
        Self {
            tx,
            epoch: Mutex::new(0),
        }
    }

    /// Current value.
    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every published value.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Start processing an identity-provider event.
    ///
    /// With an identity, publishes `{identity, None, Loading}` and returns the
    /// tag the role resolution must present. Without one, publishes the
    /// signed-out session and returns `None`.
    pub fn begin_resolution(&self, identity: Option<Identity>) -> Option<ResolutionTag> {
        let mut epoch = self.epoch.lock();
        *epoch += 1;

        match identity {
            Some(identity) => {
                let tag = ResolutionTag {
                    identity_id: identity.id.clone(),
                    epoch: *epoch,
                };
                self.publish(Session {
                    identity: Some(identity),
                    role: None,
                    status: SessionStatus::Loading,
                });
                Some(tag)
            }
            None => {
                self.publish(Session::signed_out());
                None
            }
        }
    }

    /// Apply a finished role resolution. Returns false if the result is stale.
    pub fn apply_resolution(&self, tag: &ResolutionTag, role: Role) -> bool {
        let epoch = self.epoch.lock();
        if *epoch != tag.epoch || self.tx.borrow().identity_id() != Some(tag.identity_id.as_str())
        {
            debug!(
                user_id = %tag.identity_id,
                tag_epoch = tag.epoch,
                current_epoch = *epoch,
                "Dropping stale role resolution"
            );
            return false;
        }

        self.tx.send_modify(|session| {
            session.role = Some(role);
            session.status = SessionStatus::Resolved;
        });
        true
    }

    /// Reset to the signed-out session and invalidate in-flight resolutions.
    pub fn clear(&self) {
        let mut epoch = self.epoch.lock();
        *epoch += 1;
        self.publish(Session::signed_out());
    }

    /// Record a role written by this process for `identity_id`.
    ///
    /// Invalidates in-flight resolutions so an older read cannot overwrite it.
    /// Returns false if the store no longer holds that identity.
    pub fn apply_role(&self, identity_id: &str, role: Role) -> bool {
        let mut epoch = self.epoch.lock();
        if self.tx.borrow().identity_id() != Some(identity_id) {
            return false;
        }
        *epoch += 1;
        self.tx.send_if_modified(|session| {
            let changed = session.role != Some(role) || !session.is_resolved();
            session.role = Some(role);
            session.status = SessionStatus::Resolved;
            changed
        });
        true
    }

    /// Wait for the first resolved value (returns immediately if resolved).
    pub async fn wait_resolved(&self) -> Session {
        self.wait_until(Session::is_resolved).await
    }

    /// Wait for a value matching `predicate`.
    pub async fn wait_until(&self, mut predicate: impl FnMut(&Session) -> bool) -> Session {
        let mut rx = self.subscribe();
        let session = match rx.wait_for(|session| predicate(session)).await {
            Ok(session) => session.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.snapshot(),
        };
        session
    }

    fn publish(&self, next: Session) {
        self.tx.send_if_modified(|session| {
            if *session == next {
                return false;
            }
            *session = next;
            true
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
