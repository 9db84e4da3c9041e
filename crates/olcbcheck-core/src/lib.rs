//! OpenLCB alias collision check
//!
//! Verifies how a node on a CAN segment reacts when another participant
//! claims its alias. The checker plays the intruder: it learns the target's
//! alias, probes it with CID, claims it outright with AMD, and then watches
//! whether the target gives the alias up, re-announces under a different one
//! (or stays silent), and answers later enquiries exactly once.
//!
//! # Architecture
//!
//! The check itself is a sans-IO state machine ([`CollisionCheck`]). It never
//! reads a clock or touches a socket; it consumes received frames and timeout
//! notifications and returns declarative [`CheckAction`]s. The driver
//! ([`run_check`]) executes those actions against a [`FrameLink`] and owns all
//! timing: per-read timeouts and per-phase deadlines.
//!
//! The same machine therefore runs unchanged against a TCP hub, an in-memory
//! channel, or a simulated bus in tests.
//!
//! # Components
//!
//! - [`checker`]: collision check state machine
//! - [`driver`]: async loop running the machine over a link
//! - [`link`]: frame link abstraction and channel-backed implementation
//! - [`config`]: check configuration
//! - [`error`]: check and link error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod checker;
pub mod config;
pub mod driver;
pub mod error;
pub mod link;

pub use checker::{CheckAction, CheckPhase, CheckReport, CollisionCheck};
pub use config::CheckerConfig;
pub use driver::{run_and_report, run_check};
pub use error::{CheckError, LinkError};
pub use link::{ChannelLink, FrameLink};
