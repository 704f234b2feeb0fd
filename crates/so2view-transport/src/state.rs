use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Link state as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

type Listener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Observable connection state, shared between the connector and consumers.
///
/// Listeners are invoked on the thread that performs the transition, once per
/// actual change. Setting the current state again is not reported.
#[derive(Clone)]
pub struct StateSignal {
    inner: Arc<SignalInner>,
}

struct SignalInner {
    state: Mutex<ConnectionState>,
    listeners: Mutex<Vec<Listener>>,
}

impl StateSignal {
    /// Create a signal in the `Disconnected` state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                state: Mutex::new(ConnectionState::Disconnected),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Current state.
    pub fn get(&self) -> ConnectionState {
        *self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener for subsequent transitions.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Move to `next`, notifying listeners if the state changed.
    pub fn set(&self, next: ConnectionState) {
        {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *state == next {
                return;
            }
            *state = next;
        }

        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(next);
        }
    }
}

impl Default for StateSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSignal")
            .field("state", &self.get())
            .finish()
    }
}
