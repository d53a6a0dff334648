//! Lazily established, shareable driver sessions.
//!
//! A [`LazyConnection`] opens its session on first use. Callers that arrive
//! while an attempt is in flight await that same attempt, so at most one
//! session is opened no matter how many actions race. A failed attempt is
//! forgotten and the next caller starts a fresh one. A successful one sticks
//! until [`LazyConnection::take`] is called, which also waits out an attempt
//! still in flight so its session can be released.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::driver::DriverResult;

type Attempt<T> = Shared<BoxFuture<'static, DriverResult<Arc<T>>>>;

enum State<T: ?Sized> {
    Idle,
    Connecting { generation: u64, attempt: Attempt<T> },
    Connected(Arc<T>),
}

/// A session handle that is opened at most once.
pub struct LazyConnection<T: ?Sized> {
    target: String,
    state: Mutex<State<T>>,
    next_generation: AtomicU64,
    attempts: AtomicUsize,
}

impl<T> LazyConnection<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Create an idle connection for `target` (used in logs only).
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: Mutex::new(State::Idle),
            next_generation: AtomicU64::new(0),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Return the established session, opening it with `connect` if needed.
    ///
    /// `connect` is only invoked when no session exists and no attempt is in
    /// flight.
    pub async fn get_or_connect<F>(&self, connect: F) -> DriverResult<Arc<T>>
    where
        F: FnOnce() -> BoxFuture<'static, DriverResult<Arc<T>>> + Send,
    {
        let (generation, attempt) = {
            let mut state = self.state.lock();
            match &*state {
                State::Connected(handle) => return Ok(Arc::clone(handle)),
                State::Connecting {
                    generation,
                    attempt,
                } => {
                    debug!(target_host = %self.target, "joining in-flight connection attempt");
                    (*generation, attempt.clone())
                }
                State::Idle => {
                    let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
                    self.attempts.fetch_add(1, Ordering::SeqCst);
                    debug!(target_host = %self.target, generation, "opening connection");
                    let attempt = connect().shared();
                    *state = State::Connecting {
                        generation,
                        attempt: attempt.clone(),
                    };
                    (generation, attempt)
                }
            }
        };

        let outcome = attempt.await;

        let mut state = self.state.lock();
        if let State::Connecting {
            generation: current,
            ..
        } = &*state
        {
            if *current == generation {
                *state = match &outcome {
                    Ok(handle) => State::Connected(Arc::clone(handle)),
                    Err(_) => State::Idle,
                };
            }
        }
        outcome
    }

    /// The established session, if any.
    pub fn current(&self) -> Option<Arc<T>> {
        match &*self.state.lock() {
            State::Connected(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    /// Detach the established session and return to idle.
    ///
    /// An attempt still in flight is awaited and its session, if one was
    /// opened, is returned instead of being stored. Callers joined to that
    /// attempt still receive the handle.
    pub async fn take(&self) -> Option<Arc<T>> {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Idle);
        match previous {
            State::Connected(handle) => Some(handle),
            State::Connecting { generation, attempt } => {
                debug!(target_host = %self.target, generation, "waiting for in-flight attempt before release");
                attempt.await.ok()
            }
            State::Idle => None,
        }
    }

    /// Number of connection attempts started so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// True when a session is established.
    pub fn is_connected(&self) -> bool {
        matches!(&*self.state.lock(), State::Connected(_))
    }
}
