//! Error types for the collision check.
//!
//! Failures fall into three groups:
//! - Protocol violations: a frame arrived that the active phase forbids
//! - Timeouts: a mandatory frame never arrived
//! - Link failures: the bus itself went away
//!
//! Every failure is terminal for the run. Silence that the protocol allows
//! (optional CID, optional AMD, end of the AME replies) is not an error and
//! never reaches this module.

use std::io;

use olcbcheck_proto::{Alias, FrameKind, NodeId};
use thiserror::Error;

use crate::checker::CheckPhase;

/// Errors raised by a [`crate::FrameLink`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// No more frames can be sent or received
    #[error("link closed")]
    Closed,

    /// Underlying socket error
    #[error("link I/O error: {0}")]
    Io(String),

}

impl From<io::Error> for LinkError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Reasons a collision check run fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// A frame of the wrong type arrived where a specific one is required
    #[error("frame was not {expected} frame in {}", .phase.part())]
    UnexpectedFrame {
        /// Phase active when the frame arrived
        phase: CheckPhase,
        /// Frame type the phase requires
        expected: FrameKind,
        /// Header of the offending frame
        header: u32,
    },

    /// An AMD frame carried fewer than 6 data bytes
    #[error("AMD frame did not carry node ID in {}", .phase.part())]
    MissingNodeId {
        /// Phase active when the frame arrived
        phase: CheckPhase,
        /// Header of the offending frame
        header: u32,
    },

    /// The target probed for a replacement alias using the collided one
    #[error("did not receive different alias on CID in second part (got {alias})")]
    ReprobedOriginalAlias {
        /// The reused alias
        alias: Alias,
    },

    /// The target probed or announced the reserved alias 0
    #[error("frame used reserved alias 0 in {}", .phase.part())]
    ReservedAlias {
        /// Phase active when the frame arrived
        phase: CheckPhase,
        /// Header of the offending frame
        header: u32,
    },

    /// The target re-announced itself under the collided alias
    #[error("found original alias in second AMD ({alias})")]
    OriginalAliasReannounced {
        /// The reused alias
        alias: Alias,
    },

    /// The re-announced alias differs from the one the target probed
    #[error("AMD alias {announced} did not match newly allocated one {probed}")]
    AliasMismatch {
        /// Alias seen on the CID probe
        probed: Alias,
        /// Alias seen on the AMD
        announced: Alias,
    },

    /// Wrong number of AMD replies to the final enquiry
    #[error("expected {expected} AMD frames from {target} in third part and received {observed}")]
    AmdCountMismatch {
        /// Node whose replies were counted
        target: NodeId,
        /// Replies required
        expected: usize,
        /// Replies seen
        observed: usize,
    },

    /// A mandatory frame did not arrive before the wait ran out
    #[error("did not receive expected frame while {phase}")]
    Timeout {
        /// Phase that was waiting
        phase: CheckPhase,
    },

    /// The state machine was driven out of order
    #[error("invalid operation {operation} in phase {phase:?}")]
    InvalidState {
        /// Phase when the call was made
        phase: CheckPhase,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// The link failed
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl CheckError {
    /// True if the target's behaviour broke the protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedFrame { .. }
                | Self::MissingNodeId { .. }
                | Self::ReprobedOriginalAlias { .. }
                | Self::ReservedAlias { .. }
                | Self::OriginalAliasReannounced { .. }
                | Self::AliasMismatch { .. }
                | Self::AmdCountMismatch { .. }
        )
    }

    /// True if a mandatory frame never arrived.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True if the target was judged, as opposed to the run breaking down.
    ///
    /// Link failures and misuse of the state machine say nothing about the
    /// node under test.
    pub fn is_check_failure(&self) -> bool {
        self.is_protocol_violation() || self.is_timeout()
    }
}
