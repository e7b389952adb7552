//! Session store: fingerprint-keyed ownership of engine sessions.
//!
//! One record per credential fingerprint, with creation, liveness probing,
//! refresh, explicit release, and idle reclamation. All multi-step sequences
//! (probe-or-construct, release, sweep) run under a per-fingerprint lock, so
//! two concurrent acquires for one fingerprint never construct two sessions
//! and a sweep can never reclaim a record mid-acquire. The outer map lock is
//! only ever held across map operations, never across engine I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{Fingerprint, SessionConfig};
use crate::engine::{Engine, EngineSession};
use crate::error::Result;

/// Idle threshold after which an unused session is reclaimed.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(5 * 60);
/// Interval between reclamation passes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Managed record for one live engine session.
struct SessionRecord {
    config: SessionConfig,
    handle: Arc<dyn EngineSession>,
    /// Advanced on successful acquisition and successful probes only.
    last_used_at: Instant,
}

/// Per-fingerprint state; the surrounding mutex serializes check-then-act.
#[derive(Default)]
struct Slot {
    record: Option<SessionRecord>,
}

/// Concurrency-safe mapping from credential fingerprint to engine session.
pub struct SessionStore {
    engine: Arc<dyn Engine>,
    slots: Mutex<HashMap<Fingerprint, Arc<Mutex<Slot>>>>,
}

impl SessionStore {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a live, validated session handle for `config`.
    ///
    /// Reuses the warm session when its probe passes, silently recreates it
    /// when the probe reports the session gone, and surfaces any other
    /// failure with the record removed so the next call starts clean.
    /// Callers borrow the handle for one operation and must not retain it.
    pub async fn acquire(&self, config: &SessionConfig) -> Result<Arc<dyn EngineSession>> {
        let fingerprint = config.fingerprint();
        let mut slot = self.lock_slot(&fingerprint).await;

        if let Some(record) = slot.record.take() {
            match record.handle.probe().await {
                Ok(()) => {
                    debug!(
                        target: "sb.store",
                        fingerprint = %fingerprint.token(),
                        session = %record.handle.id(),
                        "reusing warm engine session"
                    );
                    let handle = Arc::clone(&record.handle);
                    slot.record = Some(SessionRecord {
                        last_used_at: Instant::now(),
                        ..record
                    });
                    return Ok(handle);
                }
                Err(err) if err.is_session_gone() => {
                    info!(
                        target: "sb.store",
                        fingerprint = %fingerprint.token(),
                        error = %err,
                        "engine session gone; recreating"
                    );
                    close_quietly(&record.handle, "stale session").await;
                    // The record owns its config; rebuild from it.
                    return self.install(&mut *slot, record.config, &fingerprint).await;
                }
                Err(err) => {
                    // Record stays absent so a later acquire retries cleanly.
                    close_quietly(&record.handle, "failed probe").await;
                    return Err(err.into());
                }
            }
        }

        self.install(&mut *slot, config.clone(), &fingerprint).await
    }

    /// Constructs one session for `config` and installs it in the held slot.
    /// On failure nothing is installed.
    async fn install(
        &self,
        slot: &mut Slot,
        config: SessionConfig,
        fingerprint: &Fingerprint,
    ) -> Result<Arc<dyn EngineSession>> {
        let handle = self.engine.open_session(&config).await?;
        debug!(
            target: "sb.store",
            fingerprint = %fingerprint.token(),
            session = %handle.id(),
            "engine session installed"
        );
        slot.record = Some(SessionRecord {
            config,
            handle: Arc::clone(&handle),
            last_used_at: Instant::now(),
        });
        Ok(handle)
    }

    /// Closes and removes the record for `config`, if any.
    ///
    /// Close failures are logged and swallowed; removal always happens.
    pub async fn release(&self, config: &SessionConfig) {
        let fingerprint = config.fingerprint();
        let slot = { self.slots.lock().await.get(&fingerprint).cloned() };
        let Some(slot) = slot else {
            return;
        };

        let mut slot = slot.lock_owned().await;
        if let Some(record) = slot.record.take() {
            info!(
                target: "sb.store",
                fingerprint = %fingerprint.token(),
                session = %record.handle.id(),
                "releasing engine session"
            );
            close_quietly(&record.handle, "release").await;
        }
    }

    /// Closes and removes every record. Used at shutdown.
    pub async fn release_all(&self) {
        // Iterate a snapshot; slots may gain or lose entries meanwhile.
        let snapshot: Vec<_> = {
            let slots = self.slots.lock().await;
            slots.values().cloned().collect()
        };

        for slot in snapshot {
            let mut slot = slot.lock_owned().await;
            if let Some(record) = slot.record.take() {
                close_quietly(&record.handle, "shutdown").await;
            }
        }
        self.prune_empty_slots().await;
    }

    /// Reclaims every record idle for longer than `ttl`. Never fails;
    /// returns the number of sessions removed.
    pub async fn sweep(&self, ttl: Duration) -> usize {
        self.sweep_at(Instant::now(), ttl).await
    }

    /// Sweep against an explicit clock, for deterministic tests.
    pub async fn sweep_at(&self, now: Instant, ttl: Duration) -> usize {
        let snapshot: Vec<_> = {
            let slots = self.slots.lock().await;
            slots
                .iter()
                .map(|(fingerprint, slot)| (fingerprint.clone(), Arc::clone(slot)))
                .collect()
        };

        let mut removed = 0;
        for (fingerprint, slot) in snapshot {
            let mut slot = slot.lock_owned().await;
            let expired = slot
                .record
                .as_ref()
                .is_some_and(|r| now.saturating_duration_since(r.last_used_at) > ttl);
            if expired {
                if let Some(record) = slot.record.take() {
                    debug!(
                        target: "sb.store",
                        fingerprint = %fingerprint.token(),
                        session = %record.handle.id(),
                        "reclaiming idle engine session"
                    );
                    close_quietly(&record.handle, "idle sweep").await;
                    removed += 1;
                }
            }
        }

        self.prune_empty_slots().await;
        if removed > 0 {
            info!(target: "sb.store", count = removed, "idle sweep reclaimed sessions");
        }
        removed
    }

    /// Number of live records.
    pub async fn live_sessions(&self) -> usize {
        let snapshot: Vec<_> = {
            let slots = self.slots.lock().await;
            slots.values().cloned().collect()
        };
        let mut live = 0;
        for slot in snapshot {
            if slot.lock().await.record.is_some() {
                live += 1;
            }
        }
        live
    }

    /// Locks the per-fingerprint slot, retrying if the entry was pruned
    /// between fetching the slot and locking it.
    async fn lock_slot(&self, fingerprint: &Fingerprint) -> OwnedMutexGuard<Slot> {
        loop {
            let slot = {
                let mut slots = self.slots.lock().await;
                Arc::clone(slots.entry(fingerprint.clone()).or_default())
            };
            let guard = slot.clone().lock_owned().await;

            let current = {
                let slots = self.slots.lock().await;
                slots
                    .get(fingerprint)
                    .is_some_and(|entry| Arc::ptr_eq(entry, &slot))
            };
            if current {
                return guard;
            }
        }
    }

    /// Drops map entries whose slot is empty and not in use. In-use slots
    /// (lock held elsewhere) are kept; `lock_slot` revalidates against the
    /// map, so a pruned entry can never strand a freshly installed record.
    async fn prune_empty_slots(&self) {
        let mut slots = self.slots.lock().await;
        slots.retain(|_, slot| {
            slot.try_lock()
                .map(|guard| guard.record.is_some())
                .unwrap_or(true)
        });
    }

    #[cfg(test)]
    async fn backdate(&self, config: &SessionConfig, last_used_at: Instant) {
        let slot = {
            let slots = self.slots.lock().await;
            slots.get(&config.fingerprint()).cloned()
        };
        if let Some(slot) = slot {
            if let Some(record) = slot.lock().await.record.as_mut() {
                record.last_used_at = last_used_at;
            }
        }
    }
}

/// Best-effort close; failures are logged and never block the caller.
async fn close_quietly(handle: &Arc<dyn EngineSession>, context: &str) {
    if let Err(err) = handle.close().await {
        warn!(
            target: "sb.store",
            session = %handle.id(),
            error = %err,
            context,
            "engine session close failed"
        );
    }
}

/// Spawns the periodic reclamation task. Runs until aborted, concurrently
/// with request handling; it takes the same per-fingerprint locks as
/// `acquire`, so it can never close a session a handler just started using.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    interval: Duration,
    ttl: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately; skip it so the initial sweep
        // happens one full interval after startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.sweep(ttl).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::engine::EngineError;
    use crate::error::Error;

    #[derive(Default)]
    struct FakeEngine {
        constructed: AtomicUsize,
        fail_construction: AtomicBool,
        sessions: std::sync::Mutex<Vec<Arc<FakeSession>>>,
    }

    impl FakeEngine {
        fn last_session(&self) -> Arc<FakeSession> {
            self.sessions.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[derive(Debug)]
    struct FakeSession {
        id: String,
        probes: AtomicUsize,
        closed: AtomicBool,
        probe_gone: AtomicBool,
        probe_unavailable: AtomicBool,
    }

    #[async_trait]
    impl Engine for FakeEngine {
        async fn open_session(
            &self,
            _config: &SessionConfig,
        ) -> std::result::Result<Arc<dyn EngineSession>, EngineError> {
            // Widen the construction window so racing acquires would collide
            // without per-fingerprint serialization.
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_construction.load(Ordering::SeqCst) {
                return Err(EngineError::Api {
                    status: 500,
                    message: "session quota exceeded".into(),
                });
            }
            let n = self.constructed.fetch_add(1, Ordering::SeqCst);
            let session = Arc::new(FakeSession {
                id: format!("fake-{n}"),
                probes: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                probe_gone: AtomicBool::new(false),
                probe_unavailable: AtomicBool::new(false),
            });
            self.sessions.lock().unwrap().push(Arc::clone(&session));
            Ok(session)
        }
    }

    #[async_trait]
    impl EngineSession for FakeSession {
        fn id(&self) -> &str {
            &self.id
        }

        async fn probe(&self) -> std::result::Result<(), EngineError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.probe_gone.load(Ordering::SeqCst) {
                return Err(EngineError::Protocol(
                    "Execution context destroyed, most likely because of navigation".into(),
                ));
            }
            if self.probe_unavailable.load(Ordering::SeqCst) {
                return Err(EngineError::Api {
                    status: 503,
                    message: "engine overloaded".into(),
                });
            }
            Ok(())
        }

        async fn navigate(&self, _url: &str) -> std::result::Result<String, EngineError> {
            Ok("ok".into())
        }
        async fn act(&self, _i: &str) -> std::result::Result<String, EngineError> {
            Ok("ok".into())
        }
        async fn extract(&self, _i: &str) -> std::result::Result<String, EngineError> {
            Ok("{}".into())
        }
        async fn observe(&self, _i: &str) -> std::result::Result<String, EngineError> {
            Ok("[]".into())
        }
        async fn screenshot(&self) -> std::result::Result<String, EngineError> {
            Ok(String::new())
        }
        fn take_trace(&self) -> Vec<String> {
            Vec::new()
        }

        async fn close(&self) -> std::result::Result<(), EngineError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(key: &str) -> SessionConfig {
        SessionConfig::from_parts(
            Some(key.into()),
            Some("proj".into()),
            Some("sk".into()),
            None,
        )
        .unwrap()
    }

    fn store() -> (Arc<FakeEngine>, SessionStore) {
        let engine = Arc::new(FakeEngine::default());
        let store = SessionStore::new(engine.clone());
        (engine, store)
    }

    #[tokio::test]
    async fn concurrent_acquires_construct_one_session() {
        let (engine, store) = store();
        let cfg = config("k");

        let (a, b, c) = tokio::join!(
            store.acquire(&cfg),
            store.acquire(&cfg),
            store.acquire(&cfg)
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(engine.constructed.load(Ordering::SeqCst), 1);
        assert_eq!(a.id(), b.id());
        assert_eq!(b.id(), c.id());
    }

    #[tokio::test]
    async fn distinct_fingerprints_get_distinct_sessions() {
        let (engine, store) = store();
        let a = store.acquire(&config("k1")).await.unwrap();
        let b = store.acquire(&config("k2")).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(engine.constructed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn warm_session_is_reused_with_a_probe() {
        let (engine, store) = store();
        let cfg = config("k");

        let first = store.acquire(&cfg).await.unwrap();
        let second = store.acquire(&cfg).await.unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(engine.constructed.load(Ordering::SeqCst), 1);
        // Only the reuse path probes; installation trusts the fresh session.
        assert_eq!(engine.last_session().probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gone_probe_recreates_transparently() {
        let (engine, store) = store();
        let cfg = config("k");

        store.acquire(&cfg).await.unwrap();
        let first = engine.last_session();
        first.probe_gone.store(true, Ordering::SeqCst);

        let replacement = store.acquire(&cfg).await.unwrap();
        assert_ne!(replacement.id(), first.id());
        assert_eq!(engine.constructed.load(Ordering::SeqCst), 2);
        assert!(first.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn other_probe_failure_surfaces_and_clears_record() {
        let (engine, store) = store();
        let cfg = config("k");

        store.acquire(&cfg).await.unwrap();
        let first = engine.last_session();
        first.probe_unavailable.store(true, Ordering::SeqCst);

        let err = store.acquire(&cfg).await.unwrap_err();
        assert!(matches!(err, Error::Engine(ref e) if !e.is_session_gone()));
        assert_eq!(store.live_sessions().await, 0);

        // The failed record was dropped, so the next acquire starts fresh.
        first.probe_unavailable.store(false, Ordering::SeqCst);
        let fresh = store.acquire(&cfg).await.unwrap();
        assert_ne!(fresh.id(), first.id());
        assert_eq!(engine.constructed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn construction_failure_installs_nothing() {
        let (engine, store) = store();
        engine.fail_construction.store(true, Ordering::SeqCst);

        let err = store.acquire(&config("k")).await.unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(store.live_sessions().await, 0);

        engine.fail_construction.store(false, Ordering::SeqCst);
        store.acquire(&config("k")).await.unwrap();
        assert_eq!(store.live_sessions().await, 1);
    }

    #[tokio::test]
    async fn release_then_acquire_constructs_fresh() {
        let (engine, store) = store();
        let cfg = config("k");

        let first = store.acquire(&cfg).await.unwrap();
        store.release(&cfg).await;
        assert_eq!(store.live_sessions().await, 0);

        let second = store.acquire(&cfg).await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(engine.constructed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn release_of_unknown_config_is_a_noop() {
        let (_engine, store) = store();
        store.release(&config("never-acquired")).await;
        assert_eq!(store.live_sessions().await, 0);
    }

    #[tokio::test]
    async fn sweep_removes_exactly_the_expired_records() {
        let (_engine, store) = store();
        let old = config("old");
        let warm = config("warm");
        let ttl = Duration::from_secs(60);
        let anchor = Instant::now();

        store.acquire(&old).await.unwrap();
        store.acquire(&warm).await.unwrap();
        store.backdate(&old, anchor).await;
        store.backdate(&warm, anchor + ttl).await;

        // One second past `old`'s ttl, well within `warm`'s.
        let removed = store.sweep_at(anchor + ttl + Duration::from_secs(1), ttl).await;
        assert_eq!(removed, 1);
        assert_eq!(store.live_sessions().await, 1);

        // The warm record is untouched and still reusable.
        store.acquire(&warm).await.unwrap();
        assert_eq!(store.live_sessions().await, 1);
    }

    #[tokio::test]
    async fn sweep_at_exact_ttl_boundary_keeps_the_record() {
        let (_engine, store) = store();
        let cfg = config("k");
        let ttl = Duration::from_secs(60);
        let anchor = Instant::now();

        store.acquire(&cfg).await.unwrap();
        store.backdate(&cfg, anchor).await;

        // Strictly-greater-than semantics: exactly-ttl-old survives.
        assert_eq!(store.sweep_at(anchor + ttl, ttl).await, 0);
        assert_eq!(store.live_sessions().await, 1);

        assert_eq!(
            store.sweep_at(anchor + ttl + Duration::from_millis(1), ttl).await,
            1
        );
        assert_eq!(store.live_sessions().await, 0);
    }

    #[tokio::test]
    async fn release_all_drains_every_record() {
        let (_engine, store) = store();
        store.acquire(&config("a")).await.unwrap();
        store.acquire(&config("b")).await.unwrap();

        store.release_all().await;
        assert_eq!(store.live_sessions().await, 0);
        assert!(store.slots.lock().await.is_empty());
    }
}
