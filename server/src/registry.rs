use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::future::join_all;
use system::{is_png, MessageReader, SessionId, SystemError, WireMessage};
use tokio::io::AsyncBufRead;

use crate::session::{not_connected, BoxedWriter, Session};
use crate::storage::{snapshot_name, SnapshotStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub registered: u64,
    pub unregistered: u64,
    pub broadcasts: u64,
    pub delivered: u64,
    pub saved: u64,
    pub failed_saves: u64,
}

#[derive(Default)]
struct Counters {
    registered: AtomicU64,
    unregistered: AtomicU64,
    broadcasts: AtomicU64,
    delivered: AtomicU64,
    saved: AtomicU64,
    failed_saves: AtomicU64,
}

/// The set of live sessions and the fan-out between them.
pub struct Registry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    session_id_source: AtomicU32,
    store: Arc<dyn SnapshotStore>,
    max_snapshot_bytes: u64,
    write_timeout: Duration,
    counters: Counters,
}

impl Registry {
    pub fn new(store: Arc<dyn SnapshotStore>, max_snapshot_bytes: u64, write_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_id_source: AtomicU32::new(0),
            store,
            max_snapshot_bytes,
            write_timeout,
            counters: Counters::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Wraps an accepted connection's write half into an active session.
    pub fn register(&self, writer: BoxedWriter) -> Arc<Session> {
        let session = {
            let mut sessions = self.write_sessions();
            let id = self.free_session_id(&sessions);
            let session = Arc::new(Session::new(id, writer, self.write_timeout));
            sessions.insert(id, session.clone());
            session
        };
        session.activate();
        self.counters.registered.fetch_add(1, Ordering::Relaxed);
        log::info!("Session {} registered", session.id());
        session
    }

    /// Removes a session. Removing an absent session is a no-op.
    pub fn unregister(&self, session_id: SessionId) -> bool {
        let removed = self.write_sessions().remove(&session_id).is_some();
        if removed {
            self.counters.unregistered.fetch_add(1, Ordering::Relaxed);
            log::info!("Session {} unregistered", session_id);
        }
        removed
    }

    /// Closes and unregisters a session after a fault or a peer close. Safe
    /// to call from every path that notices the fault.
    pub async fn disconnect(&self, session: &Session) {
        if session.close() {
            self.unregister(session.id());
            session.shutdown().await;
        }
    }

    /// Delivers `message` to every live session except `sender` and returns
    /// how many deliveries succeeded. A failing recipient is disconnected
    /// without affecting the others.
    pub async fn broadcast(&self, message: &WireMessage, sender: SessionId) -> usize {
        let frame = system::encode(message);
        let recipients: Vec<Arc<Session>> = self
            .read_sessions()
            .values()
            .filter(|session| session.id() != sender)
            .cloned()
            .collect();
        self.counters.broadcasts.fetch_add(1, Ordering::Relaxed);

        let frame = &frame;
        let results = join_all(recipients.iter().map(|session| async move {
            match session.send_encoded(frame).await {
                Ok(()) => true,
                Err(err) => {
                    log::warn!(
                        "Dropping session {} after failed delivery: {}",
                        session.id(),
                        err
                    );
                    self.disconnect(session).await;
                    false
                }
            }
        }))
        .await;

        let delivered = results.into_iter().filter(|ok| *ok).count();
        self.counters
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        delivered
    }

    /// Receives the snapshot that follows a `save` message, stores it and
    /// reports the outcome to the requesting session only.
    ///
    /// Returns the stored name. Failures that leave the stream usable
    /// (oversized payload, not a PNG, storage error) are reported to the
    /// client and returned as `Ok(None)`; stream faults are returned as
    /// errors and end the session, as does the session closing while the
    /// payload is still arriving.
    pub async fn handle_save_request<R>(
        &self,
        session: &Session,
        reader: &mut MessageReader<R>,
    ) -> Result<Option<String>, SystemError>
    where
        R: AsyncBufRead + Unpin,
    {
        let received = tokio::select! {
            received = reader.read_bulk(self.max_snapshot_bytes) => received,
            _ = session.closed() => return Err(not_connected(session.id())),
        };
        let outcome = match received {
            Ok(bytes) => {
                log::info!("Finished receiving board from session {}", session.id());
                self.persist(session.id(), &bytes).await
            }
            Err(err @ SystemError::PayloadTooLarge { .. }) => Err(err.to_string()),
            Err(err) => return Err(err),
        };

        let reply = match &outcome {
            Ok(name) => {
                self.counters.saved.fetch_add(1, Ordering::Relaxed);
                WireMessage::Saved { name: name.clone() }
            }
            Err(reason) => {
                self.counters.failed_saves.fetch_add(1, Ordering::Relaxed);
                log::warn!("Save from session {} failed: {}", session.id(), reason);
                WireMessage::SaveFailed {
                    reason: reason.clone(),
                }
            }
        };
        session.send(&reply).await?;
        Ok(outcome.ok())
    }

    async fn persist(&self, session_id: SessionId, bytes: &[u8]) -> Result<String, String> {
        if !is_png(bytes) {
            return Err("received snapshot is not a PNG image".into());
        }
        let name = snapshot_name(chrono::Local::now(), session_id);
        self.store
            .store(&name, bytes)
            .await
            .map(|_| name)
            .map_err(|err| format!("could not store snapshot: {}", err))
    }

    pub fn get(&self, session_id: SessionId) -> Option<Arc<Session>> {
        self.read_sessions().get(&session_id).cloned()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.read_sessions().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let c = &self.counters;
        RegistryStats {
            registered: c.registered.load(Ordering::Relaxed),
            unregistered: c.unregistered.load(Ordering::Relaxed),
            broadcasts: c.broadcasts.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            saved: c.saved.load(Ordering::Relaxed),
            failed_saves: c.failed_saves.load(Ordering::Relaxed),
        }
    }

    /// Closes every session, e.g. on shutdown.
    pub async fn close_all(&self) {
        let sessions: Vec<Arc<Session>> = self.read_sessions().values().cloned().collect();
        for session in sessions {
            self.disconnect(&session).await;
        }
    }

    /// Next id from the wrapping counter that no live session holds.
    fn free_session_id(&self, sessions: &HashMap<SessionId, Arc<Session>>) -> SessionId {
        loop {
            let id = self
                .session_id_source
                .fetch_add(1, Ordering::Relaxed)
                .wrapping_add(1);
            if !sessions.contains_key(&id) {
                return id;
            }
        }
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
