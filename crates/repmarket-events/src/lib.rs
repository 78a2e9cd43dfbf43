//! # RepMarket Events
//!
//! In-process publish/subscribe bus that decouples "the session changed" from
//! "repaint the chrome".
//!
//! ## Guarantees
//!
//! - Handlers for the same event run in subscription order.
//! - A handler that returns an error or panics is isolated and logged; the
//!   remaining handlers still run and nothing propagates to the emitter.
//! - No lock is held while handlers run, so a handler may emit, subscribe or
//!   unsubscribe re-entrantly. Changes made during an emit take effect for the
//!   next emit.
//!
//! ## Example
//!
//! ```rust
//! use repmarket_events::{EventBus, EventKind, ShellEvent};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = seen.clone();
//! bus.on(EventKind::RouteChanged, move |_event| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! bus.emit(ShellEvent::RouteChanged { path: "/".into() });
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

pub mod bus;
pub mod error;
pub mod event;

pub use bus::{BusStats, DeliveryReport, EventBus, Handler, SubscriptionId};
pub use error::EventError;
pub use event::{EventKind, NoticeLevel, ShellEvent};
