//! # Event Bus
//!
//! Typed broadcast channel decoupling the engine from host UI. Auth and
//! publish progress flow through one [`EventBus`] backed by
//! `tokio::sync::broadcast`; subscribers that fall behind receive
//! `RecvError::Lagged` and keep going, a closed channel signals shutdown.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! let bus = EventBus::new(100);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Auth(AuthEvent::SigningIn)).ok();
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::SendError, Receiver, Sender};

/// Default buffer size when using [`EventBus::default`]
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Authentication lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthEvent {
    /// Interactive authorization started; the browser is being opened
    SigningIn,
    /// Token exchange completed and a credential was stored
    SignedIn { user_id: Option<String> },
    /// Credential cleared (logout or irrecoverable refresh failure)
    SignedOut,
    /// A refresh produced a new access token
    TokenRefreshed { expires_at: i64 },
    /// Authentication error surfaced to the user
    AuthError { message: String },
}

/// Publish run progress events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PublishEvent {
    /// A publish run started for a collection
    RunStarted { collection_id: String },
    /// The remote roll this run will publish into was resolved
    RollResolved { roll_id: String, created: bool },
    /// One item reached its terminal Published state
    ItemPublished {
        asset: String,
        photograph_id: String,
    },
    /// One item reached its terminal Failed state
    ItemFailed { asset: String, reason: String },
    /// The run loop stopped on the cancellation signal
    RunCancelled { published: u32, failed: u32 },
    /// The run completed; non-zero `failed` is a warning, not an error
    RunCompleted { published: u32, failed: u32 },
}

/// Top-level event type broadcast on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreEvent {
    Auth(AuthEvent),
    Publish(PublishEvent),
}

/// Central broadcast channel for engine events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged` and continue from the oldest retained event.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event; an error
    /// means there were no active subscribers, which callers treat as
    /// non-fatal (`let _ = bus.emit(..)`).
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new independent subscription.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}
