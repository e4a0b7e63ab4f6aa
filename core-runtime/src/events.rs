//! # Event Bus System
//!
//! Provides an event-driven architecture for the receipt connector using
//! `tokio::sync::broadcast`. Session and upload components publish typed events;
//! the host UI subscribes to drive its "connected" indicator and reconnect prompt.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for session and upload domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Subscribe with `subscribe()`, unsubscribe by dropping the receiver
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     emit      ┌───────────┐
//! │ Session State ├──────────────>│           │     subscribe    ┌────────────┐
//! └───────────────┘               │ EventBus  ├─────────────────>│  Host UI   │
//!                                 │ (broadcast│                  └────────────┘
//! ┌───────────────┐     emit      │  channel) │     subscribe    ┌────────────┐
//! │ Upload Coord. ├──────────────>│           ├─────────────────>│  Logs view │
//! └───────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, SessionEvent};
//!
//! let event_bus = EventBus::new(100);
//! let event = CoreEvent::Session(SessionEvent::SessionChanged {
//!     is_authenticated: true,
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, SessionEvent};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(CoreEvent::Session(SessionEvent::ReconnectRequired { reason })) => {
//!                 println!("Please reconnect: {}", reason);
//!             }
//!             Ok(_) => {}
//!             Err(RecvError::Lagged(n)) => eprintln!("Missed {} events", n),
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Event Types
//!
//! ### Session Events
//! - `AuthorizationStarted`: An authorization attempt opened the provider page
//! - `StateChanged`: Any accepted session state transition (debug-level)
//! - `SessionChanged`: The authenticated flag flipped
//! - `ReconnectRequired`: The session dropped to unauthenticated; the user must reconnect
//! - `Validated`: The provider confirmed the stored credential
//!
//! ### Upload Events
//! - `Started`: An upload job went in flight
//! - `Succeeded`: The provider stored the file
//! - `Failed`: The job reached a terminal failure
//!
//! ## Ordering
//!
//! Session events are published while the session writer lock is held, so every
//! subscriber observes them in acceptance order.
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session and authorization events
    Session(SessionEvent),
    /// Upload job events
    Upload(UploadEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Upload(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Upload(UploadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Session(SessionEvent::ReconnectRequired { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::SessionChanged { .. }) => EventSeverity::Info,
            CoreEvent::Upload(UploadEvent::Succeeded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events published by the session state machine and authorization flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// An authorization attempt started.
    AuthorizationStarted {
        /// Generation assigned to the attempt.
        generation: u64,
    },
    /// An accepted state transition.
    StateChanged {
        /// State name before the transition.
        from: String,
        /// State name after the transition.
        to: String,
        /// Generation after the transition.
        generation: u64,
    },
    /// The authenticated flag changed.
    SessionChanged {
        /// New value of the flag.
        is_authenticated: bool,
    },
    /// The session became unauthenticated and the user must reconnect.
    ReconnectRequired {
        /// Human-readable cause.
        reason: String,
    },
    /// The provider accepted the stored credential.
    Validated {
        /// Account the credential belongs to.
        account_id: String,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::AuthorizationStarted { .. } => "Authorization started",
            SessionEvent::StateChanged { .. } => "Session state changed",
            SessionEvent::SessionChanged { is_authenticated: true } => "Connected",
            SessionEvent::SessionChanged { is_authenticated: false } => "Disconnected",
            SessionEvent::ReconnectRequired { .. } => "Reconnect required",
            SessionEvent::Validated { .. } => "Session validated",
        }
    }
}

// ============================================================================
// Upload Events
// ============================================================================

/// Events published by the upload coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// The job went in flight.
    Started {
        job_id: String,
        destination_name: String,
    },
    /// The provider stored the file.
    Succeeded {
        job_id: String,
        remote_path: String,
    },
    /// The job failed.
    Failed {
        job_id: String,
        /// Human-readable failure, shown in the capture log.
        message: String,
        /// Whether the user has to reconnect before retrying.
        requires_reconnect: bool,
    },
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::Started { .. } => "Upload started",
            UploadEvent::Succeeded { .. } => "Upload succeeded",
            UploadEvent::Failed { .. } => "Upload failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::{EventBus, CoreEvent, SessionEvent};
    ///
    /// let event_bus = EventBus::new(100);
    /// let event = CoreEvent::Session(SessionEvent::ReconnectRequired {
    ///     reason: "token revoked".to_string(),
    /// });
    ///
    /// match event_bus.emit(event) {
    ///     Ok(n) => println!("Event sent to {} subscribers", n),
    ///     Err(_) => println!("No active subscribers"),
    /// }
    /// ```
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    ///
    /// drop(subscriber);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let session_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Session(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every event currently buffered that passes the filter.
    ///
    /// Lagged gaps are skipped.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
