//! One-time passcode store and verifier.
//!
//! An [`OtpStore`] maps a normalized email address to at most one outstanding
//! [`OtpRecord`]. The same store type backs the password-reset and the
//! email-verification flows; each flow owns its own instance so issuing a
//! code in one flow never replaces a code in the other.
//!
//! ## Verification order
//!
//! `verify` checks, in order: record present, not expired, not already used,
//! attempt cap not reached, code matches. The first failing check decides the
//! [`OtpError`] returned. A mismatch increments `attempts`; a match flips
//! `verified` once. Both mutations happen while the map entry is locked.
//!
//! ## Expiry
//!
//! Expiry is lazy: every read path compares `expires_at` against the injected
//! [`Clock`]. The [`sweeper`] only reclaims memory held by abandoned records.

pub mod clock;
mod code;
mod config;
mod error;
pub mod rate_limit;
mod record;
mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use code::{codes_match, generate_code};
pub use config::OtpConfig;
pub use error::OtpError;
pub use record::{OtpRecord, OtpSnapshot, Verified};
pub use store::{normalize_email, valid_email, OtpStore};
