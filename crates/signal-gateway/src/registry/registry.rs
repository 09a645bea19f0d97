//! Identity → connection registry
//!
//! A single mutex guards both the identity map and the reverse
//! connection → identity index, so register, lookup and removal are
//! linearizable with respect to each other. The lock is never held across an
//! `.await`.

use crate::connection::{ConnectionHandle, ConnectionId};
use crate::protocol::{Identity, RegistrationMetadata};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One identity's current registration
#[derive(Debug, Clone)]
pub struct Registration {
    /// Connection currently answering to the identity
    pub handle: ConnectionHandle,
    /// Metadata supplied with the register envelope
    pub metadata: RegistrationMetadata,
    /// When this registration was made
    pub registered_at: DateTime<Utc>,
}

/// What a call to [`Registry::register`] displaced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registered {
    /// Another connection that previously held the identity
    pub replaced: Option<ConnectionId>,
    /// An identity this connection held before and gave up
    pub released: Option<Identity>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Identity to registration
    by_identity: HashMap<Identity, Registration>,

    /// Connection to the identity it is registered under
    by_connection: HashMap<ConnectionId, Identity>,
}

/// Shared mapping from identity to live connection
///
/// At most one connection per identity, and at most one identity per
/// connection.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register `identity` on the connection behind `handle`
    ///
    /// Overwrites any existing registration of the identity; the previous
    /// connection is not closed, it simply stops receiving. If this
    /// connection was registered under a different identity, that
    /// registration is released.
    pub fn register(
        &self,
        identity: Identity,
        handle: ConnectionHandle,
        metadata: RegistrationMetadata,
    ) -> Registered {
        let connection_id = handle.id();
        let mut inner = self.inner.lock();
        let mut outcome = Registered::default();

        if let Some(previous) = inner.by_connection.get(&connection_id).cloned() {
            if previous != identity {
                inner.remove_if_owned(&previous, connection_id);
                outcome.released = Some(previous);
            }
        }

        let registration = Registration {
            handle,
            metadata,
            registered_at: Utc::now(),
        };

        if let Some(old) = inner.by_identity.insert(identity.clone(), registration) {
            let old_id = old.handle.id();
            if old_id != connection_id {
                inner.by_connection.remove(&old_id);
                outcome.replaced = Some(old_id);
            }
        }

        inner.by_connection.insert(connection_id, identity.clone());
        inner.debug_check();
        drop(inner);

        tracing::debug!(
            device_id = %identity,
            connection_id = %connection_id,
            replaced = ?outcome.replaced,
            released = ?outcome.released,
            "Identity registered"
        );

        outcome
    }

    /// Look up the live connection registered under `identity`
    ///
    /// A handle whose connection has already gone away is reported as absent.
    pub fn lookup(&self, identity: &Identity) -> Option<ConnectionHandle> {
        self.inner
            .lock()
            .by_identity
            .get(identity)
            .map(|registration| registration.handle.clone())
            .filter(ConnectionHandle::is_alive)
    }

    /// Remove the registration owned by `connection_id`
    ///
    /// Returns the identity that was removed, or `None` if the connection
    /// holds no registration (never registered, or superseded by a newer
    /// registration of the same identity, which is left untouched).
    pub fn remove_by_connection(&self, connection_id: ConnectionId) -> Option<Identity> {
        let mut inner = self.inner.lock();
        let identity = inner.by_connection.remove(&connection_id)?;
        let removed = inner.remove_if_owned(&identity, connection_id);
        inner.debug_check();
        drop(inner);

        if removed {
            tracing::debug!(
                device_id = %identity,
                connection_id = %connection_id,
                "Identity unregistered"
            );
            Some(identity)
        } else {
            None
        }
    }

    /// Full registration record for `identity`
    pub fn registration(&self, identity: &Identity) -> Option<Registration> {
        self.inner.lock().by_identity.get(identity).cloned()
    }

    /// Identity a connection is registered under
    pub fn identity_of(&self, connection_id: ConnectionId) -> Option<Identity> {
        self.inner.lock().by_connection.get(&connection_id).cloned()
    }

    /// Check whether `identity` is registered
    pub fn contains(&self, identity: &Identity) -> bool {
        self.inner.lock().by_identity.contains_key(identity)
    }

    /// Number of registered identities
    pub fn len(&self) -> usize {
        self.inner.lock().by_identity.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RegistryInner {
    /// Remove `identity` only if `connection_id` still owns it
    fn remove_if_owned(&mut self, identity: &Identity, connection_id: ConnectionId) -> bool {
        let owned = self
            .by_identity
            .get(identity)
            .is_some_and(|registration| registration.handle.id() == connection_id);

        if owned {
            self.by_identity.remove(identity);
        }

        owned
    }

    /// Both maps must describe the same set of registrations
    fn debug_check(&self) {
        debug_assert_eq!(self.by_identity.len(), self.by_connection.len());
        debug_assert!(self.by_connection.iter().all(|(connection_id, identity)| self
            .by_identity
            .get(identity)
            .is_some_and(|registration| registration.handle.id() == *connection_id)));
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("registrations", &self.len())
            .finish()
    }
}
