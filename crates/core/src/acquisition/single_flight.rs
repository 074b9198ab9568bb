//! Keyed single-flight execution.
//!
//! At most one task runs per key. Callers arriving while a task is running
//! join it and receive a clone of its result. The task is cancelled once its
//! last caller goes away, and the key is released on every exit path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tracing::debug;

/// Outcome of [`SingleFlight::run`].
#[derive(Debug)]
pub struct Flight<T> {
    /// The task's result, or `None` if the task ended without producing one.
    pub value: Option<T>,
    /// Whether this caller joined a task started by another caller.
    pub joined: bool,
}

/// Resolves when the running task should stop.
pub struct CancelSignal {
    rx: oneshot::Receiver<()>,
}

impl CancelSignal {
    /// Wait for cancellation. Also resolves if the registry entry is dropped.
    pub async fn cancelled(self) {
        let _ = self.rx.await;
    }
}

/// Snapshot of a running task.
#[derive(Debug, Clone)]
pub struct FlightInfo {
    pub key: String,
    pub started_at: DateTime<Utc>,
    pub waiters: usize,
}

struct Entry<T> {
    generation: u64,
    started_at: DateTime<Utc>,
    waiters: usize,
    rx: watch::Receiver<Option<T>>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl<T> Entry<T> {
    fn signal_cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

struct Registry<T> {
    next_generation: u64,
    entries: HashMap<String, Entry<T>>,
}

type Shared<T> = Arc<Mutex<Registry<T>>>;

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of running tasks, keyed by string.
pub struct SingleFlight<T> {
    registry: Shared<T>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_generation: 0,
                entries: HashMap::new(),
            })),
        }
    }

    /// Cancel the task running under `key`.
    ///
    /// The key is released immediately; current waiters receive whatever
    /// the task produces in response to its [`CancelSignal`].
    pub fn cancel(&self, key: &str) -> bool {
        let mut registry = lock(&self.registry);
        match registry.entries.remove(key) {
            Some(mut entry) => {
                entry.signal_cancel();
                true
            }
            None => false,
        }
    }

    /// Snapshot of running tasks.
    pub fn in_flight(&self) -> Vec<FlightInfo> {
        let registry = lock(&self.registry);
        let mut infos: Vec<FlightInfo> = registry
            .entries
            .iter()
            .map(|(key, entry)| FlightInfo {
                key: key.clone(),
                started_at: entry.started_at,
                waiters: entry.waiters,
            })
            .collect();
        infos.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.key.cmp(&b.key)));
        infos
    }

    pub fn is_running(&self, key: &str) -> bool {
        lock(&self.registry).entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Run the task for `key`, or join the one already running.
    ///
    /// `make` is only called when no task is running for `key`. The task is
    /// spawned, so it keeps running while at least one caller is waiting.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> Flight<T>
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (mut rx, generation, joined) = {
            let mut registry = lock(&self.registry);

            if let Some(entry) = registry.entries.get_mut(key) {
                entry.waiters += 1;
                (entry.rx.clone(), entry.generation, true)
            } else {
                let generation = registry.next_generation;
                registry.next_generation += 1;

                let (tx, rx) = watch::channel(None);
                let (cancel_tx, cancel_rx) = oneshot::channel();
                let task = make(CancelSignal { rx: cancel_rx });
                let release = ReleaseGuard {
                    registry: Arc::clone(&self.registry),
                    key: key.to_string(),
                    generation,
                };

                // The task cannot touch the registry before this entry is
                // inserted: releasing takes the lock held here.
                // The key is released before the value is published, so a
                // waiter that retries never finds the finished entry.
                tokio::spawn(async move {
                    let release = release;
                    let value = task.await;
                    drop(release);
                    let _ = tx.send(Some(value));
                });

                registry.entries.insert(
                    key.to_string(),
                    Entry {
                        generation,
                        started_at: Utc::now(),
                        waiters: 1,
                        rx: rx.clone(),
                        cancel_tx: Some(cancel_tx),
                    },
                );
                (rx, generation, false)
            }
        };

        let _waiter = WaiterGuard {
            registry: Arc::clone(&self.registry),
            key: key.to_string(),
            generation,
        };

        let value = match rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };

        Flight { value, joined }
    }
}

/// Held by the spawned task; releases the key when the task ends.
struct ReleaseGuard<T> {
    registry: Shared<T>,
    key: String,
    generation: u64,
}

impl<T> Drop for ReleaseGuard<T> {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        let current = registry
            .entries
            .get(&self.key)
            .is_some_and(|e| e.generation == self.generation);
        if current {
            registry.entries.remove(&self.key);
        }
    }
}

/// Held by each waiting caller; cancels the task when the last one leaves
/// before a result exists.
struct WaiterGuard<T> {
    registry: Shared<T>,
    key: String,
    generation: u64,
}

impl<T> Drop for WaiterGuard<T> {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        let abandoned = match registry.entries.get_mut(&self.key) {
            Some(entry) if entry.generation == self.generation => {
                entry.waiters = entry.waiters.saturating_sub(1);
                entry.waiters == 0 && entry.rx.borrow().is_none()
            }
            _ => false,
        };

        if abandoned {
            if let Some(mut entry) = registry.entries.remove(&self.key) {
                debug!(key = %self.key, "All waiters gone, cancelling task");
                entry.signal_cancel();
            }
        }
    }
}
