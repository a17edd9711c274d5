//! Real-time notification fan-out
//!
//! One broadcast channel per karaoke event. Coordinators publish after their
//! transaction commits; SSE handlers join a channel through
//! [`Notifier::join`].

mod broadcaster;

pub use broadcaster::Notifier;
