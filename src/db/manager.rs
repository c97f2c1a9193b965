//! Connection manager
//!
//! Owns the profile store and every live connection. Connections open
//! lazily on first use, are shared as `Arc<ActiveConnection>`, and are
//! looked up by profile name; nothing outside this module holds a handle
//! across a close.

use crate::config::{ConnectionProfile, ProfileStore};
use crate::db::provider::{Connection, Database, LostReceiver};
use crate::db::schema::SchemaNode;
use crate::db::types::QueryResults;
use crate::config::CONNECTIONS_FILE;
use crate::error::{ConfigError, ConfigResult, DbError, DbResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};

/// Out-of-band events about live connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionNotice {
    /// The server side went away; the next open reconnects
    Lost { profile: String, message: String },
}

/// Registry of profiles and their live connections
pub struct ConnectionManager {
    store: RwLock<ProfileStore>,
    /// Live connections indexed by profile name
    active: RwLock<HashMap<String, Arc<ActiveConnection>>>,
    /// Serializes connects so one profile never gets two handles
    connect_lock: Mutex<()>,
    /// Orders writes of connections.toml
    save_lock: Mutex<()>,
    query_timeout: Option<Duration>,
    notices: Option<mpsc::UnboundedSender<ConnectionNotice>>,
}

impl ConnectionManager {
    pub fn new(store: ProfileStore, query_timeout: Option<Duration>) -> Self {
        Self {
            store: RwLock::new(store),
            active: RwLock::new(HashMap::new()),
            connect_lock: Mutex::new(()),
            save_lock: Mutex::new(()),
            query_timeout,
            notices: None,
        }
    }

    /// Deliver [`ConnectionNotice`]s to `tx`
    pub fn with_notices(mut self, tx: mpsc::UnboundedSender<ConnectionNotice>) -> Self {
        self.notices = Some(tx);
        self
    }

    // ── Profiles ────────────────────────────────────────────

    /// Profiles ordered by usage, then group, then name
    pub async fn list_profiles(&self) -> Vec<ConnectionProfile> {
        self.store
            .read()
            .await
            .profiles()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn profile(&self, name: &str) -> Option<ConnectionProfile> {
        self.store.read().await.get(name).cloned()
    }

    pub async fn add_profile(&self, profile: ConnectionProfile) -> ConfigResult<()> {
        let name = profile.name.clone();
        let _saving = self.save_lock.lock().await;
        self.store.write().await.add(profile)?;
        tracing::info!(profile = %name, "connection profile added");
        Ok(())
    }

    /// Replace a profile. A live connection for the old definition is closed.
    pub async fn update_profile(&self, name: &str, profile: ConnectionProfile) -> ConfigResult<()> {
        let new_name = profile.name.clone();
        let _saving = self.save_lock.lock().await;
        self.store.write().await.update(name, profile)?;
        self.close(name).await;
        tracing::info!(profile = %name, new_name = %new_name, "connection profile updated");
        Ok(())
    }

    /// Delete a profile, closing its connection first
    pub async fn remove_profile(&self, name: &str) -> ConfigResult<ConnectionProfile> {
        let removed = {
            let _saving = self.save_lock.lock().await;
            self.store.write().await.remove(name)?
        };
        self.close(name).await;
        tracing::info!(profile = %name, "connection profile removed");
        Ok(removed)
    }

    // ── Connections ─────────────────────────────────────────

    /// Return the live connection for `name`, connecting if needed.
    ///
    /// A connection that was reported lost is replaced.
    pub async fn open(&self, name: &str) -> DbResult<Arc<ActiveConnection>> {
        if let Some(conn) = self.live(name).await {
            return Ok(conn);
        }

        let connecting = self.connect_lock.lock().await;
        if let Some(conn) = self.live(name).await {
            return Ok(conn);
        }

        let profile = self
            .profile(name)
            .await
            .ok_or_else(|| DbError::ConnectionFailed(format!("Unknown connection '{}'", name)))?;

        let (db, lost) = Connection::open(&profile).await.inspect_err(|e| {
            tracing::warn!(profile = %name, error = %e, "connect failed");
        })?;
        let engine = profile.engine_kind();
        let conn = Arc::new(ActiveConnection::new(profile, db, self.query_timeout));
        if let Some(lost) = lost {
            self.watch(name.to_string(), Arc::downgrade(&conn), lost);
        }

        self.active
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&conn));
        drop(connecting);

        // usage ordering is cosmetic; a failed save must not fail the connect
        if let Err(e) = self.record_use(name).await {
            tracing::warn!(profile = %name, error = %e, "failed to record connection use");
        }

        tracing::info!(profile = %name, engine = %engine, "connection opened");
        Ok(conn)
    }

    /// Bump the usage count and write the store on the blocking pool, with
    /// no store or connect lock held during the write
    async fn record_use(&self, name: &str) -> ConfigResult<()> {
        let _saving = self.save_lock.lock().await;
        let snapshot = {
            let mut store = self.store.write().await;
            store.record_use(name)?;
            store.snapshot()?
        };
        let Some(snapshot) = snapshot else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || snapshot.write())
            .await
            .map_err(|e| ConfigError::Io {
                path: CONNECTIONS_FILE.to_string(),
                source: std::io::Error::other(e),
            })?
    }

    /// Open and immediately discard a connection for an unsaved profile
    pub async fn test_connection(&self, profile: &ConnectionProfile) -> DbResult<()> {
        let (db, _lost) = Connection::open(profile).await?;
        let check = db.execute_query("SELECT 1").await;
        if let Err(e) = db.close().await {
            tracing::warn!(profile = %profile.name, error = %e, "close after connection test failed");
        }
        check.map(|_| ())
    }

    /// Cancel in-flight work and release the handle. Returns false if
    /// nothing was open.
    pub async fn close(&self, name: &str) -> bool {
        let Some(conn) = self.active.write().await.remove(name) else {
            return false;
        };
        conn.shutdown().await;
        tracing::info!(profile = %name, "connection closed");
        true
    }

    /// Close every live connection (shutdown)
    pub async fn close_all(&self) {
        let drained: Vec<(String, Arc<ActiveConnection>)> =
            self.active.write().await.drain().collect();
        for (name, conn) in drained {
            conn.shutdown().await;
            tracing::debug!(profile = %name, "connection closed at shutdown");
        }
    }

    pub async fn is_open(&self, name: &str) -> bool {
        self.live(name).await.is_some()
    }

    /// Names of live connections
    pub async fn open_names(&self) -> Vec<String> {
        self.active
            .read()
            .await
            .iter()
            .filter(|(_, c)| !c.is_lost())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// The live connection, without connecting
    pub async fn get(&self, name: &str) -> Option<Arc<ActiveConnection>> {
        self.live(name).await
    }

    async fn live(&self, name: &str) -> Option<Arc<ActiveConnection>> {
        self.active
            .read()
            .await
            .get(name)
            .filter(|c| !c.is_lost())
            .cloned()
    }

    fn watch(&self, name: String, conn: Weak<ActiveConnection>, mut lost: LostReceiver) {
        let notices = self.notices.clone();
        tokio::spawn(async move {
            if let Some(message) = lost.recv().await {
                if let Some(conn) = conn.upgrade() {
                    conn.mark_lost();
                }
                if let Some(tx) = notices {
                    let _ = tx.send(ConnectionNotice::Lost {
                        profile: name,
                        message,
                    });
                }
            }
        });
    }
}

/// A live, opened handle to one database
pub struct ActiveConnection {
    profile: ConnectionProfile,
    db: Connection,
    /// One statement at a time per connection
    gate: Mutex<()>,
    /// Execution id currently inside the driver. Held across a driver
    /// cancel so the slot cannot change hands mid-cancel.
    running: Mutex<Option<u64>>,
    lost: AtomicBool,
    timeout: Option<Duration>,
}

impl ActiveConnection {
    fn new(profile: ConnectionProfile, db: Connection, timeout: Option<Duration>) -> Self {
        Self {
            profile,
            db,
            gate: Mutex::new(()),
            running: Mutex::new(None),
            lost: AtomicBool::new(false),
            timeout,
        }
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }

    /// The execution currently inside the driver, if any
    pub async fn running_execution(&self) -> Option<u64> {
        *self.running.lock().await
    }

    fn ensure_usable(&self) -> DbResult<()> {
        if self.is_lost() {
            return Err(DbError::NotConnected(self.profile.name.clone()));
        }
        Ok(())
    }

    /// Execute SQL verbatim. Waits for earlier executions on this
    /// connection to finish first.
    pub async fn execute(&self, exec_id: u64, sql: &str) -> DbResult<QueryResults> {
        let _turn = self.gate.lock().await;
        self.ensure_usable()?;

        *self.running.lock().await = Some(exec_id);
        let _slot = RunningSlot(self);
        tracing::debug!(profile = %self.profile.name, exec_id, "executing");

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.db.execute_query(sql)).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(e) = self.db.cancel_query().await {
                        tracing::warn!(error = %e, "cancel after timeout failed");
                    }
                    Err(DbError::Timeout(limit))
                }
            },
            None => self.db.execute_query(sql).await,
        };
        // waits out a cancel that is still talking to the driver
        *self.running.lock().await = None;

        match &result {
            Ok(results) => tracing::info!(
                profile = %self.profile.name,
                exec_id,
                rows = results.row_count(),
                elapsed_ms = results.execution_time().as_millis() as u64,
                "query finished"
            ),
            Err(e) => tracing::info!(profile = %self.profile.name, exec_id, error = %e, "query failed"),
        }
        result
    }

    /// Read the catalog into a fresh tree
    pub async fn introspect(&self) -> DbResult<Vec<SchemaNode>> {
        let _turn = self.gate.lock().await;
        self.ensure_usable()?;
        let nodes = self.db.get_schema().await?;
        tracing::debug!(profile = %self.profile.name, nodes = nodes.len(), "schema loaded");
        Ok(nodes)
    }

    /// Cancel `exec_id` if it is the statement currently running.
    /// Returns false when that execution is queued or already done.
    pub async fn cancel(&self, exec_id: u64) -> bool {
        let running = self.running.lock().await;
        if *running != Some(exec_id) {
            return false;
        }
        match self.db.cancel_query().await {
            Ok(()) => {
                tracing::info!(profile = %self.profile.name, exec_id, "cancel requested");
                true
            }
            Err(e) => {
                tracing::warn!(profile = %self.profile.name, exec_id, error = %e, "cancel failed");
                false
            }
        }
    }

    async fn shutdown(&self) {
        {
            let running = self.running.lock().await;
            if running.is_some()
                && let Err(e) = self.db.cancel_query().await
            {
                tracing::warn!(profile = %self.profile.name, error = %e, "cancel on close failed");
            }
        }
        if let Err(e) = self.db.close().await {
            tracing::warn!(profile = %self.profile.name, error = %e, "close failed");
        }
    }
}

/// Clears the running slot when the execution future is dropped mid-run.
/// If a cancel holds the slot at that moment it stays stale until the next
/// execution overwrites it.
struct RunningSlot<'a>(&'a ActiveConnection);

impl Drop for RunningSlot<'_> {
    fn drop(&mut self) {
        if let Ok(mut running) = self.0.running.try_lock() {
            *running = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::CellValue;

    const ENDLESS: &str =
        "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c";

    fn manager(timeout: Option<Duration>) -> ConnectionManager {
        let mut store = ProfileStore::in_memory();
        store
            .add(ConnectionProfile::sqlite("mem", ":memory:"))
            .unwrap();
        ConnectionManager::new(store, timeout)
    }

    #[tokio::test]
    async fn test_open_reuses_live_connection() {
        let mgr = manager(None);
        let a = mgr.open("mem").await.unwrap();
        let b = mgr.open("mem").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(mgr.profile("mem").await.unwrap().usage_count, 1);
    }

    #[tokio::test]
    async fn test_open_unknown_profile() {
        let mgr = manager(None);
        let err = mgr.open("nope").await.err().unwrap();
        assert!(matches!(err, DbError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_close_then_reopen_gives_new_handle() {
        let mgr = manager(None);
        let first = mgr.open("mem").await.unwrap();
        first.execute(1, "CREATE TABLE t (x)").await.unwrap();
        assert!(mgr.close("mem").await);
        assert!(!mgr.is_open("mem").await);
        assert!(!mgr.close("mem").await);

        let second = mgr.open("mem").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        // old handle is released
        assert!(first.execute(2, "SELECT 1").await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_running_statement() {
        let mgr = manager(None);
        let conn = mgr.open("mem").await.unwrap();

        let worker = Arc::clone(&conn);
        let handle = tokio::spawn(async move { worker.execute(7, ENDLESS).await });

        // only the running execution id is cancellable
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!conn.cancel(8).await);
            conn.cancel(7).await;
        }
        assert_eq!(handle.await.unwrap(), Err(DbError::Cancelled));
        assert_eq!(conn.running_execution().await, None);

        // connection stays usable
        let results = conn.execute(9, "SELECT 1").await.unwrap();
        assert_eq!(results.rows()[0].values, vec![CellValue::Integer(1)]);
    }

    #[tokio::test]
    async fn test_cancel_does_not_reach_next_statement() {
        let mgr = manager(None);
        let conn = mgr.open("mem").await.unwrap();

        let worker = Arc::clone(&conn);
        let endless = tokio::spawn(async move { worker.execute(7, ENDLESS).await });
        while conn.running_execution().await != Some(7) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let next = Arc::clone(&conn);
        let queued = tokio::spawn(async move { next.execute(8, "SELECT 1").await });
        assert!(conn.cancel(7).await);

        assert_eq!(endless.await.unwrap(), Err(DbError::Cancelled));
        assert!(queued.await.unwrap().is_ok());
        // 7 is finished, so it no longer names anything cancellable
        assert!(!conn.cancel(7).await);
    }

    #[tokio::test]
    async fn test_timeout_cancels_statement() {
        let mgr = manager(Some(Duration::from_millis(200)));
        let conn = mgr.open("mem").await.unwrap();
        let err = conn.execute(1, ENDLESS).await.unwrap_err();
        assert_eq!(err, DbError::Timeout(Duration::from_millis(200)));
        assert!(conn.execute(2, "SELECT 1").await.is_ok());
    }

    #[tokio::test]
    async fn test_executions_are_serialized() {
        let mgr = manager(None);
        let conn = mgr.open("mem").await.unwrap();
        conn.execute(1, "CREATE TABLE log (n INTEGER)").await.unwrap();

        let mut handles = Vec::new();
        for n in 0..8u64 {
            let conn = Arc::clone(&conn);
            handles.push(tokio::spawn(async move {
                conn.execute(n + 10, &format!("INSERT INTO log VALUES ({})", n))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let results = conn.execute(99, "SELECT count(*) FROM log").await.unwrap();
        assert_eq!(results.rows()[0].values, vec![CellValue::Integer(8)]);
    }

    #[tokio::test]
    async fn test_remove_profile_closes_connection() {
        let mgr = manager(None);
        mgr.open("mem").await.unwrap();
        mgr.remove_profile("mem").await.unwrap();
        assert!(!mgr.is_open("mem").await);
        assert!(mgr.list_profiles().await.is_empty());
    }

    #[tokio::test]
    async fn test_test_connection_does_not_register() {
        let mgr = manager(None);
        let profile = ConnectionProfile::sqlite("scratch", ":memory:");
        mgr.test_connection(&profile).await.unwrap();
        assert!(mgr.open_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_persists_usage_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONNECTIONS_FILE);
        let mut store = ProfileStore::load(path.clone()).unwrap();
        store
            .add(ConnectionProfile::sqlite("mem", ":memory:"))
            .unwrap();
        let mgr = ConnectionManager::new(store, None);

        mgr.open("mem").await.unwrap();
        mgr.close("mem").await;
        mgr.open("mem").await.unwrap();

        let reloaded = ProfileStore::load(path).unwrap();
        assert_eq!(reloaded.get("mem").unwrap().usage_count, 2);
        // the in-memory store stays writable after the background save
        mgr.add_profile(ConnectionProfile::sqlite("other", ":memory:"))
            .await
            .unwrap();
        assert_eq!(mgr.list_profiles().await.len(), 2);
    }
}
