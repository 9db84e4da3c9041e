//! Wire model for OpenLCB CAN alias negotiation.
//!
//! OpenLCB nodes sit on CAN with a 29-bit extended header. During alias
//! negotiation the header carries a control-frame code in bits 12..27 and the
//! sender's 12-bit alias in bits 0..11. Everything above the alias is fixed by
//! the standard, so classification is a masked comparison on the header and
//! never needs the payload.
//!
//! # Components
//!
//! - [`CanFrame`]: immutable header + 0..8 data bytes, with classification
//! - [`ControlFrame`]: the alias-management control codes (RID, AMD, AME, AMR)
//! - [`Alias`]: 12-bit node alias
//! - [`NodeId`]: 6-byte globally unique node identifier
//! - [`gridconnect`]: ASCII `:X...N...;` codec used by OpenLCB TCP hubs
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alias;
pub mod errors;
pub mod frame;
pub mod gridconnect;
pub mod node_id;

pub use alias::Alias;
pub use errors::{ProtocolError, Result};
pub use frame::{CanFrame, ControlFrame, FrameKind};
pub use gridconnect::GridConnectDecoder;
pub use node_id::NodeId;
