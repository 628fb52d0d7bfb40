use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch::{channel, Receiver, Sender};

/// A one-shot readiness latch with any number of waiters.
///
/// A `Signal` starts out pending and transitions to resolved exactly
/// once; the transition is irreversible and resolving an already
/// resolved signal is a no-op.  Every page controller in the client
/// uses one of these wherever the original markup-driven code stashed
/// a promise resolver in an outer variable: authentication becoming
/// known, shared fragments having been inlined, a page's primary list
/// having been rendered.
///
/// Cloning a `Signal` clones the handle, not the latch; all clones
/// observe the same resolution.
#[derive(Clone)]
pub struct Signal {
    inner: Arc<SignalInner>,
}

struct SignalInner {
    sender: Sender<bool>,
}

/// A subscription to a [`Signal`], held by whichever future needs to
/// wait for the resolution.
///
/// Obtained from [`Signal::subscribe`].  To use one within a future,
/// move a clone of the signal into the future and subscribe from
/// there, or subscribe up front and move the subscription itself.
pub struct SignalSubscription {
    // holding the signal keeps the sender side alive for the whole
    // wait, so the channel cannot close under the receiver
    signal: Signal,
    receiver: Receiver<bool>,
}

/// The wait-for-all combination of several [`Signal`]s.
///
/// Produced by [`Signal::all`]; replaces the ad-hoc boolean flags the
/// pages used to check from a shared function whenever two independent
/// completions both gated the same work.
pub struct SignalSet {
    subscriptions: Vec<SignalSubscription>,
}

impl Signal {
    /// Create a new signal in the pending state.
    pub fn new() -> Signal {
        let (sender, _) = channel(false);
        Signal {
            inner: Arc::new(SignalInner { sender }),
        }
    }

    /// Transition the signal to resolved, releasing every current and
    /// future waiter.
    ///
    /// Calling this on an already resolved signal is a safe no-op, so
    /// producer paths that may fire more than once (a second identity
    /// notification, a late fragment injection) need no guarding.
    pub fn resolve(&self) {
        self.inner.sender.send_replace(true);
    }

    /// Whether the signal has resolved.
    pub fn is_resolved(&self) -> bool {
        *self.inner.sender.borrow()
    }

    /// Subscribe to the resolution of this signal.
    pub fn subscribe(&self) -> SignalSubscription {
        SignalSubscription {
            signal: self.clone(),
            receiver: self.inner.sender.subscribe(),
        }
    }

    /// Combine signals such that the returned set completes only after
    /// every one of them has resolved.
    ///
    /// An empty iterator yields a set whose wait completes immediately.
    pub fn all(signals: impl IntoIterator<Item = Signal>) -> SignalSet {
        SignalSet {
            subscriptions: signals.into_iter().map(|s| s.subscribe()).collect(),
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Signal::new()
    }
}

impl SignalSubscription {
    /// Asynchronously wait for the signal to resolve.
    ///
    /// If the signal already resolved, this returns without suspending
    /// the caller beyond the await point itself; there is no missed
    /// wake-up between subscribing and waiting.
    pub async fn wait(mut self) {
        self.receiver
            .wait_for(|resolved| *resolved)
            .await
            .expect("internal error: sender not properly managed");
    }
}

impl SignalSet {
    /// Wait for every signal in the set to resolve.
    pub async fn wait(self) {
        join_all(self.subscriptions.into_iter().map(SignalSubscription::wait)).await;
    }
}

mod debug {
    use super::*;
    use std::fmt;

    impl fmt::Debug for Signal {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Signal")
                .field("resolved", &*self.inner.sender.borrow())
                .field("subscribers", &self.inner.sender.receiver_count())
                .finish()
        }
    }

    impl fmt::Debug for SignalSubscription {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("SignalSubscription")
                .field("signal", &self.signal)
                .finish()
        }
    }
}
