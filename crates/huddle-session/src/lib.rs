//! Participant sessions for Huddle.
//!
//! This crate holds the rules that don't depend on which room a
//! connection is in:
//!
//! 1. **Identity binding**: what counts as a valid display name and
//!    character ([`Identity`])
//! 2. **Connection lifecycle**: the per-connection state machine from
//!    admission to disconnect ([`SessionPhase`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← stores identities on participants, reports phases
//!     ↕
//! Session Layer (this crate)  ← validates identity, tracks lifecycle
//! ```

mod error;
mod identity;
mod session;

pub use error::SessionError;
pub use identity::Identity;
pub use session::{SessionEvent, SessionPhase};
