//! Collision check state machine.
//!
//! The checker impersonates a node that claims the target's alias, and
//! grades the target's reaction.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Methods take the received frame (or a timeout notification) as input
//! - Methods return `Result<Vec<CheckAction>, CheckError>`
//! - The driver executes actions (purge, send) and owns all waiting
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ start ┌──────────┐ AMD(target) ┌──────────┐  RID  ┌──────────┐
//! │ Init │──────>│ Identify │────────────>│ AwaitRid │──────>│ AwaitAmr │
//! └──────┘  AME  └──────────┘  CID7(alias)└──────────┘  AMD  └──────────┘
//!                                                               │ AMR
//!                                                               ↓
//! ┌──────┐ quiet ┌────────┐ AMD(new)/quiet ┌─────────────────┐ ┌──────────────┐
//! │ Done │<──────│ Verify │<───────────────│ AwaitReannounce │<│ AwaitReprobe │
//! └──────┘       └────────┘      AME       └─────────────────┘ └──────────────┘
//!                                                          CID(new)/quiet
//! ```
//!
//! Any violation or missing mandatory frame moves the machine to `Failed`.
//!
//! # Phases
//!
//! 1. **Identify**: enquire with AME, learn the target's alias from its AMD
//! 2. **AwaitRid**: probe that alias with CID7; the owner must answer RID
//! 3. **AwaitAmr**: claim the alias with AMD; the owner must release it (AMR)
//! 4. **AwaitReprobe**: optional CID7 for a replacement alias
//! 5. **AwaitReannounce**: optional AMD under the replacement alias
//! 6. **Verify**: enquire again; the target must answer once if it
//!    re-announced, and not at all otherwise
//!
//! Silence ends phases 4-6 normally. Silence in phases 1-3 fails the check.

use std::fmt;

use olcbcheck_proto::{Alias, CanFrame, FrameKind, NodeId};
use tracing::{debug, trace};

use crate::{config::CheckerConfig, error::CheckError};

/// Actions returned by the check state machine.
///
/// The driver executes them in order before feeding the next input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckAction {
    /// Discard everything already queued on the link
    Purge,

    /// Send this frame
    SendFrame(CanFrame),

    /// The check passed
    Complete(CheckReport),
}

/// Check phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckPhase {
    /// Created, nothing sent yet
    Init,
    /// AME sent, waiting for the target's AMD
    Identify,
    /// CID7 sent with the target's alias, waiting for RID
    AwaitRid,
    /// Colliding AMD sent, waiting for AMR
    AwaitAmr,
    /// Waiting for an optional CID7 with a replacement alias
    AwaitReprobe,
    /// Waiting for an optional AMD under the replacement alias
    AwaitReannounce,
    /// Final AME sent, counting the target's AMD replies
    Verify,
    /// Check passed
    Done,
    /// Check failed
    Failed,
}

impl CheckPhase {
    /// Section of the check the phase belongs to, as used in failure reports.
    pub fn part(self) -> &'static str {
        match self {
            Self::Init | Self::Identify => "first part",
            Self::AwaitRid | Self::AwaitAmr | Self::AwaitReprobe | Self::AwaitReannounce => {
                "second part"
            },
            Self::Verify | Self::Done | Self::Failed => "third part",
        }
    }

    /// What the check is doing while in this phase.
    pub fn description(self) -> &'static str {
        match self {
            Self::Init => "starting",
            Self::Identify => "waiting for AMD frame in first part",
            Self::AwaitRid => "waiting for RID in response to CID frame",
            Self::AwaitAmr => "waiting for AMR in response to AMD frame",
            Self::AwaitReprobe => "waiting for optional CID frame in second part",
            Self::AwaitReannounce => "waiting for AMD frame in second part",
            Self::Verify => "counting AMD replies in third part",
            Self::Done => "finished",
            Self::Failed => "failed",
        }
    }

    /// True if silence in this phase is an acceptable outcome.
    pub fn tolerates_silence(self) -> bool {
        matches!(self, Self::AwaitReprobe | Self::AwaitReannounce | Self::Verify)
    }
}

impl fmt::Display for CheckPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of a passed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Node that was checked
    pub target: NodeId,
    /// Alias the target held before the collision
    pub original_alias: Alias,
    /// Replacement alias the target probed for, if any
    pub new_alias: Option<Alias>,
    /// Whether the target re-announced itself with AMD after the collision
    pub reannounced: bool,
    /// AMD replies from the target to the final enquiry
    pub verify_amd_count: usize,
}

/// Target identity and the alias the checker collides with.
#[derive(Debug, Clone, Copy)]
struct Claim {
    target: NodeId,
    original_alias: Alias,
}

/// Collision check state machine.
///
/// One instance covers one run; nothing survives between runs.
#[derive(Debug, Clone)]
pub struct CollisionCheck {
    phase: CheckPhase,
    configured_target: Option<NodeId>,
    query_alias: Alias,
    claim: Option<Claim>,
    new_alias: Option<Alias>,
    reannounced: bool,
    verify_amd_count: usize,
}

impl CollisionCheck {
    /// Create a check in `Init` state.
    pub fn new(config: &CheckerConfig) -> Self {
        Self {
            phase: CheckPhase::Init,
            configured_target: config.target,
            query_alias: config.query_alias,
            claim: None,
            new_alias: None,
            reannounced: false,
            verify_amd_count: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> CheckPhase {
        self.phase
    }

    /// Target node, once configured or learned.
    pub fn target(&self) -> Option<NodeId> {
        self.claim.map(|claim| claim.target).or(self.configured_target)
    }

    /// Alias the target held when the check found it.
    pub fn original_alias(&self) -> Option<Alias> {
        self.claim.map(|claim| claim.original_alias)
    }

    /// Replacement alias seen on the target's CID probe.
    pub fn new_alias(&self) -> Option<Alias> {
        self.new_alias
    }

    /// Whether the target re-announced itself after the collision.
    pub fn reannounced(&self) -> bool {
        self.reannounced
    }

    /// AMD replies from the target counted so far in `Verify`.
    pub fn verify_amd_count(&self) -> usize {
        self.verify_amd_count
    }

    /// Begin the check: clear stale traffic and enquire for all aliases.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if not in `Init`.
    pub fn start(&mut self) -> Result<Vec<CheckAction>, CheckError> {
        if self.phase != CheckPhase::Init {
            return Err(CheckError::InvalidState { phase: self.phase, operation: "start" });
        }

        self.phase = CheckPhase::Identify;
        Ok(vec![CheckAction::Purge, CheckAction::SendFrame(CanFrame::ame(self.query_alias))])
    }

    /// Feed a received frame.
    ///
    /// # Errors
    ///
    /// Returns the violation if the frame breaks the protocol, or
    /// `InvalidState` if the check is not running.
    pub fn handle_frame(&mut self, frame: &CanFrame) -> Result<Vec<CheckAction>, CheckError> {
        trace!(phase = ?self.phase, %frame, "frame received");

        let result = match self.phase {
            CheckPhase::Identify => self.on_identify(frame),
            CheckPhase::AwaitRid => self.on_await_rid(frame),
            CheckPhase::AwaitAmr => self.on_await_amr(frame),
            CheckPhase::AwaitReprobe => self.on_await_reprobe(frame),
            CheckPhase::AwaitReannounce => self.on_await_reannounce(frame),
            CheckPhase::Verify => self.on_verify(frame),
            CheckPhase::Init | CheckPhase::Done | CheckPhase::Failed => {
                return Err(CheckError::InvalidState {
                    phase: self.phase,
                    operation: "handle_frame",
                });
            },
        };

        self.settle(result)
    }

    /// Report that the bus stayed quiet for a full wait.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if a mandatory frame was outstanding, a count
    /// mismatch if the final enquiry got the wrong number of replies, or
    /// `InvalidState` if the check is not running.
    pub fn handle_timeout(&mut self) -> Result<Vec<CheckAction>, CheckError> {
        let result = match self.phase {
            CheckPhase::Init | CheckPhase::Done | CheckPhase::Failed => {
                return Err(CheckError::InvalidState {
                    phase: self.phase,
                    operation: "handle_timeout",
                });
            },
            phase if !phase.tolerates_silence() => Err(CheckError::Timeout { phase }),
            CheckPhase::AwaitReprobe => {
                debug!("no replacement alias probed");
                self.enter(CheckPhase::AwaitReannounce);
                Ok(vec![])
            },
            CheckPhase::AwaitReannounce => {
                debug!("no re-announcement");
                self.begin_verify()
            },
            _ => self.finish(),
        };

        self.settle(result)
    }

    fn settle(
        &mut self,
        result: Result<Vec<CheckAction>, CheckError>,
    ) -> Result<Vec<CheckAction>, CheckError> {
        if result.is_err() {
            self.phase = CheckPhase::Failed;
        }
        result
    }

    fn enter(&mut self, phase: CheckPhase) {
        debug!(from = ?self.phase, to = ?phase, "phase change");
        self.phase = phase;
    }

    fn claim(&self) -> Result<Claim, CheckError> {
        self.claim.ok_or(CheckError::InvalidState { phase: self.phase, operation: "claim" })
    }

    /// Node ID of an AMD frame; short payloads are a violation in every phase.
    fn amd_node_id(&self, frame: &CanFrame) -> Result<NodeId, CheckError> {
        frame
            .node_id()
            .ok_or(CheckError::MissingNodeId { phase: self.phase, header: frame.header() })
    }

    fn on_identify(&mut self, frame: &CanFrame) -> Result<Vec<CheckAction>, CheckError> {
        if !frame.is_amd() {
            return Ok(vec![]);
        }

        let node = self.amd_node_id(frame)?;
        if self.configured_target.is_some_and(|target| target != node) {
            trace!(%node, "AMD from another node");
            return Ok(vec![]);
        }

        let original_alias = frame.alias();
        debug!(%node, alias = %original_alias, "target identified");
        self.claim = Some(Claim { target: node, original_alias });
        self.enter(CheckPhase::AwaitRid);

        Ok(vec![CheckAction::Purge, CheckAction::SendFrame(CanFrame::cid7(node, original_alias))])
    }

    fn on_await_rid(&mut self, frame: &CanFrame) -> Result<Vec<CheckAction>, CheckError> {
        if !frame.is_rid() {
            return Err(self.unexpected(frame, FrameKind::Rid));
        }

        let claim = self.claim()?;
        self.enter(CheckPhase::AwaitAmr);
        Ok(vec![CheckAction::SendFrame(CanFrame::amd(claim.original_alias, claim.target))])
    }

    fn on_await_amr(&mut self, frame: &CanFrame) -> Result<Vec<CheckAction>, CheckError> {
        if !frame.is_amr() {
            return Err(self.unexpected(frame, FrameKind::Amr));
        }

        self.enter(CheckPhase::AwaitReprobe);
        Ok(vec![])
    }

    fn on_await_reprobe(&mut self, frame: &CanFrame) -> Result<Vec<CheckAction>, CheckError> {
        if !frame.is_cid() {
            return Err(self.unexpected(frame, FrameKind::Cid));
        }

        let claim = self.claim()?;
        let alias = frame.alias();
        if alias.is_reserved() {
            return Err(self.reserved(frame));
        }
        if alias == claim.original_alias {
            return Err(CheckError::ReprobedOriginalAlias { alias });
        }

        debug!(%alias, "replacement alias probed");
        self.new_alias = Some(alias);
        self.enter(CheckPhase::AwaitReannounce);
        Ok(vec![])
    }

    fn on_await_reannounce(&mut self, frame: &CanFrame) -> Result<Vec<CheckAction>, CheckError> {
        if !frame.is_amd() {
            return Ok(vec![]);
        }

        let claim = self.claim()?;
        let node = self.amd_node_id(frame)?;
        if node != claim.target {
            return Ok(vec![]);
        }

        let alias = frame.alias();
        if alias.is_reserved() {
            return Err(self.reserved(frame));
        }
        if alias == claim.original_alias {
            return Err(CheckError::OriginalAliasReannounced { alias });
        }
        if let Some(probed) = self.new_alias.filter(|probed| *probed != alias) {
            return Err(CheckError::AliasMismatch { probed, announced: alias });
        }

        debug!(%alias, "target re-announced");
        self.reannounced = true;
        self.begin_verify()
    }

    fn on_verify(&mut self, frame: &CanFrame) -> Result<Vec<CheckAction>, CheckError> {
        if !frame.is_amd() {
            return Ok(vec![]);
        }

        let claim = self.claim()?;
        if self.amd_node_id(frame)? == claim.target {
            self.verify_amd_count += 1;
            trace!(count = self.verify_amd_count, "target answered enquiry");
        }
        Ok(vec![])
    }

    fn begin_verify(&mut self) -> Result<Vec<CheckAction>, CheckError> {
        self.enter(CheckPhase::Verify);
        Ok(vec![CheckAction::Purge, CheckAction::SendFrame(CanFrame::ame(self.query_alias))])
    }

    fn finish(&mut self) -> Result<Vec<CheckAction>, CheckError> {
        let claim = self.claim()?;
        let expected = usize::from(self.reannounced);
        if self.verify_amd_count != expected {
            return Err(CheckError::AmdCountMismatch {
                target: claim.target,
                expected,
                observed: self.verify_amd_count,
            });
        }

        self.enter(CheckPhase::Done);
        Ok(vec![CheckAction::Complete(CheckReport {
            target: claim.target,
            original_alias: claim.original_alias,
            new_alias: self.new_alias,
            reannounced: self.reannounced,
            verify_amd_count: self.verify_amd_count,
        })])
    }

    fn unexpected(&self, frame: &CanFrame, expected: FrameKind) -> CheckError {
        CheckError::UnexpectedFrame { phase: self.phase, expected, header: frame.header() }
    }

    fn reserved(&self, frame: &CanFrame) -> CheckError {
        CheckError::ReservedAlias { phase: self.phase, header: frame.header() }
    }
}
