//! Runs [`Action`]s against the connection manager
//!
//! Every database call happens on a spawned task; the outcome is sent back
//! to the UI loop as an [`AppEvent`]. Execution tasks are tracked by
//! execution id so a cancel can abort one that is still queued behind
//! another statement on the same connection.

use crate::app::{Action, AppEvent};
use crate::browser::SchemaBrowser;
use crate::config::ConnectionProfile;
use crate::db::ConnectionManager;
use crate::error::DbError;
use crate::tabs::{Abandoned, ExecutionTicket};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

pub struct Dispatcher {
    manager: Arc<ConnectionManager>,
    events: mpsc::UnboundedSender<AppEvent>,
    executions: Arc<Mutex<HashMap<u64, AbortHandle>>>,
}

impl Dispatcher {
    pub fn new(manager: Arc<ConnectionManager>, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            manager,
            events,
            executions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start the work behind `action`. Returns false once the app should exit.
    pub fn dispatch(&self, action: Action) -> bool {
        match action {
            Action::None => {}
            Action::Quit => return false,
            Action::Batch(actions) => {
                for action in actions {
                    if !self.dispatch(action) {
                        return false;
                    }
                }
            }
            Action::Execute(ticket) => self.execute(ticket),
            Action::Cancel(abandoned) => self.cancel(abandoned),
            Action::RefreshSchema {
                profile,
                refresh_id,
            } => self.refresh(profile, refresh_id),
            Action::Open(profile) => self.open(profile),
            Action::Close(profile) => self.close(profile),
            Action::SaveProfile { original, profile } => self.save(original, profile),
            Action::RemoveProfile(name) => self.remove(name),
            Action::TestProfile(profile) => self.test(profile),
        }
        true
    }

    /// Number of executions still in flight
    pub fn pending_executions(&self) -> usize {
        self.executions.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn execute(&self, ticket: ExecutionTicket) {
        let manager = Arc::clone(&self.manager);
        let tx = self.events.clone();
        let executions = Arc::clone(&self.executions);
        let exec_id = ticket.exec_id;

        // Hold the lock across spawn so the task cannot deregister first
        let Ok(mut running) = self.executions.lock() else {
            tracing::error!(exec_id, "execution registry poisoned");
            return;
        };
        let handle = tokio::spawn(async move {
            let was_open = manager.is_open(&ticket.profile).await;
            let result = match manager.open(&ticket.profile).await {
                Ok(conn) => {
                    if !was_open {
                        let _ = tx.send(AppEvent::Connected {
                            profile: ticket.profile.clone(),
                            result: Ok(()),
                        });
                        send_profiles(&manager, &tx).await;
                    }
                    conn.execute(ticket.exec_id, &ticket.sql).await
                }
                Err(e) => Err(e),
            };
            if let Ok(mut running) = executions.lock() {
                running.remove(&ticket.exec_id);
            }
            let _ = tx.send(AppEvent::QueryFinished {
                tab_id: ticket.tab_id,
                exec_id: ticket.exec_id,
                result,
            });
        });
        running.insert(exec_id, handle.abort_handle());
    }

    fn cancel(&self, abandoned: Abandoned) {
        let manager = Arc::clone(&self.manager);
        let executions = Arc::clone(&self.executions);
        tokio::spawn(async move {
            let cancelled = match manager.get(&abandoned.profile).await {
                Some(conn) => conn.cancel(abandoned.exec_id).await,
                None => false,
            };
            if cancelled {
                return;
            }
            // Not running yet: drop the task while it waits its turn
            let handle = executions
                .lock()
                .ok()
                .and_then(|mut running| running.remove(&abandoned.exec_id));
            if let Some(handle) = handle {
                tracing::debug!(exec_id = abandoned.exec_id, "aborting queued execution");
                handle.abort();
            }
        });
    }

    fn refresh(&self, profile: String, refresh_id: u64) {
        let manager = Arc::clone(&self.manager);
        let tx = self.events.clone();
        tokio::spawn(async move {
            // A refresh never reconnects; a closed profile reports as such
            let result = match manager.get(&profile).await {
                Some(conn) => SchemaBrowser::refresh(&conn).await,
                None => Err(DbError::NotConnected(profile)),
            };
            let _ = tx.send(AppEvent::SchemaLoaded { refresh_id, result });
        });
    }

    fn open(&self, profile: String) {
        let manager = Arc::clone(&self.manager);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = manager.open(&profile).await.map(|_| ());
            let _ = tx.send(AppEvent::Connected { profile, result });
            send_profiles(&manager, &tx).await;
        });
    }

    fn close(&self, profile: String) {
        let manager = Arc::clone(&self.manager);
        let tx = self.events.clone();
        tokio::spawn(async move {
            manager.close(&profile).await;
            let _ = tx.send(AppEvent::Disconnected { profile });
            send_profiles(&manager, &tx).await;
        });
    }

    fn save(&self, original: Option<String>, profile: ConnectionProfile) {
        let manager = Arc::clone(&self.manager);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let name = profile.name.clone();
            let result = match original.as_deref() {
                Some(old) => manager.update_profile(old, profile).await,
                None => manager.add_profile(profile).await,
            };
            match result {
                Ok(()) => {
                    let _ = tx.send(AppEvent::ProfileSaved { original, name });
                    send_profiles(&manager, &tx).await;
                }
                Err(e) => {
                    let _ = tx.send(AppEvent::ProfileError(e.to_string()));
                }
            }
        });
    }

    fn remove(&self, name: String) {
        let manager = Arc::clone(&self.manager);
        let tx = self.events.clone();
        tokio::spawn(async move {
            match manager.remove_profile(&name).await {
                Ok(_) => {
                    let _ = tx.send(AppEvent::ProfileRemoved(name));
                    send_profiles(&manager, &tx).await;
                }
                Err(e) => {
                    let _ = tx.send(AppEvent::ProfileError(e.to_string()));
                }
            }
        });
    }

    fn test(&self, profile: ConnectionProfile) {
        let manager = Arc::clone(&self.manager);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = manager.test_connection(&profile).await;
            let _ = tx.send(AppEvent::TestFinished {
                profile: profile.name,
                result,
            });
        });
    }
}

async fn send_profiles(manager: &ConnectionManager, tx: &mpsc::UnboundedSender<AppEvent>) {
    let _ = tx.send(AppEvent::ProfilesChanged {
        profiles: manager.list_profiles().await,
        open: manager.open_names().await,
    });
}
