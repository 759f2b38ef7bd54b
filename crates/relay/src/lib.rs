//! Account-to-webhook relay.
//!
//! Polls one social-media account for new posts and stories and forwards
//! them to Discord-compatible webhooks:
//!
//! - posts go out as canonical links, oldest first
//! - stories are captured to disk, uploaded, and removed on success
//! - forwarded item ids are persisted so nothing is sent twice
//!
//! [`forwarder::Forwarder`] drives the cycle; [`source::ContentSource`] is
//! the seam to the upstream service and [`webhook::DeliveryChannel`] the
//! seam to the outbound transport.

pub mod config;
pub mod forwarder;
pub mod source;
pub mod store;

// Re-export main types
pub use config::Config;
pub use forwarder::{CycleReport, Forwarder, ForwarderConfig};
pub use source::{ApiSource, ContentSource, Session, SourceError};
pub use store::{Kind, Storage};
