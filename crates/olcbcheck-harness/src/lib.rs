//! Deterministic simulation harness for the alias collision check.
//!
//! Three ways to put something on the far side of the checker:
//!
//! - [`ScriptedLink`]: replays exact frame batches, one per frame sent
//! - [`SimBus`]: in-memory segment of reactive [`SimNode`]s
//! - [`SimHub`]: the same nodes behind a GridConnect TCP hub, for turmoil
//!
//! Nodes draw replacement aliases from a seeded `ChaCha8Rng`, so every run
//! is reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scripted_link;
pub mod sim_bus;
pub mod sim_hub;
pub mod sim_node;

pub use scripted_link::ScriptedLink;
pub use sim_bus::SimBus;
pub use sim_hub::{HUB_PORT, SimHub};
pub use sim_node::{NodeFault, SimNode};
