//! In-memory trip registry and WebSocket fan-out.
//!
//! The registry is the single source of truth for trips; the broadcaster
//! pushes `tripCreated` events to every connected client and supports
//! per-trip rooms for targeted delivery. Both are constructed once in
//! `main` and shared through [`crate::state::AppState`].

pub mod broadcaster;
pub mod registry;
pub mod socket;

pub use broadcaster::{Broadcaster, ConnectionId};
pub use registry::TripRegistry;
