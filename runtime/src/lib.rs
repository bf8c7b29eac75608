//! # Bayline Runtime
//!
//! Runtime implementation for the Bayline facility model.
//!
//! This crate provides the Store runtime that owns feature state, runs the
//! reducer for every action and executes the effects it returns.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Event Loop**: Manages the action → reducer → effects → action feedback loop
//!
//! ## Concurrency
//!
//! State lives behind a single `RwLock` and is only ever mutated by the
//! reducer while the write lock is held, so there is exactly one mutator at
//! a time. Timers (`Effect::Delay`) are tokio tasks whose action re-enters the
//! store through [`Store::send`]; they are abandoned when the store shuts down.
//!
//! ## Example
//!
//! ```ignore
//! use bayline_runtime::Store;
//!
//! let store = Store::new(FacilityState::default(), FacilityReducer::new(), environment);
//!
//! // Send an action
//! store.send(FacilityAction::Session(SessionAction::StartPolling)).await?;
//!
//! // Read state
//! let status = store.state(|s| s.sessions.current_status()).await;
//! ```

use bayline_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};

pub use error::StoreError;
pub use store::Store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    ///
    /// Reducers themselves never fail: rejected commands are no-ops.
    /// These errors concern the runtime around them.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

/// Configuration for Store instances
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for slow observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            default_shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] so callers can wait until the effects of
/// that action have finished. Only the action's own effects are tracked;
/// actions they feed back get handles of their own.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(FacilityAction::Booking(BookingAction::Confirm)).await?;
/// handle.wait_with_timeout(Duration::from_secs(1)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle plus the tracking context the executor carries
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracking context is gone, nothing left to wait for
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counters on drop
///
/// Keeps both the per-handle counter and the store-wide pending count
/// accurate even if an effect future panics.
struct EffectGuard {
    tracking: EffectTracking,
    pending: Arc<AtomicUsize>,
}

impl EffectGuard {
    fn start(tracking: EffectTracking, pending: &Arc<AtomicUsize>) -> Self {
        tracking.increment();
        pending.fetch_add(1, Ordering::SeqCst);
        Self {
            tracking,
            pending: Arc::clone(pending),
        }
    }
}

impl Drop for EffectGuard {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.tracking.decrement();
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicUsize, Duration, Effect, EffectGuard, EffectHandle, EffectTracking, Ordering,
        Reducer, RwLock, StoreConfig, StoreError, broadcast, watch,
    };

    struct Inner<S, A, E, R> {
        state: RwLock<S>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutdown: watch::Sender<bool>,
        pending_effects: Arc<AtomicUsize>,
        /// Actions produced by effects, published after they were reduced
        action_broadcast: broadcast::Sender<A>,
    }

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, written only by the reducer)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Cloning a store is cheap; clones share the same state.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R> {
        inner: Arc<Inner<S, A, E, R>>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R> {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Sync + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let (shutdown, _) = watch::channel(false);

            Self {
                inner: Arc::new(Inner {
                    state: RwLock::new(initial_state),
                    reducer,
                    environment,
                    config,
                    shutdown,
                    pending_effects: Arc::new(AtomicUsize::new(0)),
                    action_broadcast,
                }),
            }
        }

        /// The environment this store injects into its reducer
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.inner.environment
        }

        /// Number of effects still running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.inner.pending_effects.load(Ordering::SeqCst)
        }

        /// Whether [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            *self.inner.shutdown.borrow()
        }

        /// Send an action to the store
        ///
        /// The reducer runs under the state write lock; the returned effects
        /// are then started and tracked by the returned [`EffectHandle`].
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.is_shutting_down() {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.inner.state.write().await;

                let start = std::time::Instant::now();
                let effects =
                    self.inner
                        .reducer
                        .reduce(&mut *state, action, &self.inner.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }

            Ok(handle)
        }

        /// Send an action and wait for a matching action produced by effects
        ///
        /// Subscribes before sending so no matching action can be missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before a matching action arrived
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.inner.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to actions produced by effects
        ///
        /// Each action is published after the reducer has processed it, so an
        /// observer reading state on receipt sees the effect of that action.
        /// Actions sent directly through [`Store::send`] are not published.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.inner.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let available = store.state(|s| s.bays.available_count()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.inner.state.read().await;
            f(&*state)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// New actions are rejected, pending delays are abandoned, and the
        /// call waits for in-flight futures to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still
        /// running when the timeout expires.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating store shutdown");
            self.inner.shutdown.send_replace(true);

            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let pending = self.pending_effects();
                if pending == 0 {
                    tracing::info!("Store shutdown complete");
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    tracing::warn!(pending, "Store shutdown timed out");
                    return Err(StoreError::ShutdownTimeout(pending));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        /// Shut down using the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.inner.config.default_shutdown_timeout)
                .await
        }

        /// Feed an effect-produced action back into the store and publish it
        async fn feed_back(&self, action: A) {
            match self.send(action.clone()).await {
                Ok(_) => {
                    let _ = self.inner.action_broadcast.send(action);
                },
                Err(error) => {
                    tracing::debug!(%error, "Dropped effect-produced action");
                },
            }
        }

        /// Execute an effect with tracking
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Delay`: Waits for duration, then sends action (abandoned on shutdown)
        /// - `Parallel`: Executes effects concurrently
        /// - `Sequential`: Executes effects in order, waiting for each to complete
        ///
        /// Effect failures (panics in spawned tasks) are isolated to their task.
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let guard = EffectGuard::start(tracking, &self.inner.pending_effects);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action");
                            store.feed_back(action).await;
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let guard = EffectGuard::start(tracking, &self.inner.pending_effects);
                    let store = self.clone();
                    let mut shutdown = self.inner.shutdown.subscribe();

                    tokio::spawn(async move {
                        let _guard = guard;
                        tokio::select! {
                            () = tokio::time::sleep(duration) => {
                                tracing::trace!(?duration, "Effect::Delay elapsed");
                                store.feed_back(*action).await;
                            }
                            () = async {
                                // Drop the watch guard before the select resolves
                                let _ = shutdown.wait_for(|stopping| *stopping).await;
                            } => {
                                tracing::trace!("Effect::Delay abandoned on shutdown");
                            }
                        }
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel")
                        .increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    let guard = EffectGuard::start(tracking, &self.inner.pending_effects);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        for effect in effects {
                            let (mut step, step_tracking) = EffectHandle::new();
                            store.execute_effect(effect, step_tracking);
                            step.wait().await;
                        }
                    });
                },
            }
        }
    }
}
