//! Simulated OpenLCB node.
//!
//! A [`SimNode`] is a sans-IO model of a node's alias handling: feed it every
//! frame seen on the bus and it returns the frames the node would send in
//! response. It is deliberately small. It answers enquiries, defends its
//! alias against probes, and gives the alias up when someone else announces
//! it. Everything else on the bus is ignored.
//!
//! [`NodeFault`] bends one rule at a time so the checker's failure paths can
//! be driven by realistic misbehaviour rather than hand-written frame lists.

use olcbcheck_proto::{Alias, CanFrame, ControlFrame, NodeId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// A single deliberate protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFault {
    /// Never answer a CID probe for the node's alias with RID.
    IgnoreCid,
    /// Keep the alias when another node announces it.
    NeverRelinquish,
    /// Re-acquire the very alias that was just lost.
    ReuseAlias,
    /// Probe one alias and announce a different one.
    AnnounceUnprobed,
    /// Answer every enquiry twice.
    DuplicateAmd,
    /// Answer enquiries with an AMD that carries no node ID.
    TruncatedAmd,
}

/// Simulated node with a seeded alias generator.
#[derive(Debug, Clone)]
pub struct SimNode {
    node_id: NodeId,
    alias: Option<Alias>,
    reacquire: bool,
    fault: Option<NodeFault>,
    rng: ChaCha8Rng,
}

impl SimNode {
    /// Create a permitted node holding `alias`.
    ///
    /// The node re-acquires a fresh alias after losing one. `seed` fixes the
    /// aliases it picks.
    pub fn new(node_id: NodeId, alias: Alias, seed: u64) -> Self {
        Self {
            node_id,
            alias: Some(alias),
            reacquire: true,
            fault: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Stay silent after losing the alias instead of re-acquiring one.
    pub fn without_reacquire(mut self) -> Self {
        self.reacquire = false;
        self
    }

    /// Inject a fault.
    pub fn with_fault(mut self, fault: NodeFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// The node's ID.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The alias currently held, if any.
    pub fn alias(&self) -> Option<Alias> {
        self.alias
    }

    /// React to one frame seen on the bus.
    ///
    /// Returns the frames the node transmits in response, in order.
    pub fn on_frame(&mut self, frame: &CanFrame) -> Vec<CanFrame> {
        let Some(alias) = self.alias else {
            return Vec::new();
        };

        if frame.is_ame() {
            return self.answer_enquiry(frame, alias);
        }

        if frame.alias() != alias {
            return Vec::new();
        }

        if frame.is_check_id() {
            if self.fault == Some(NodeFault::IgnoreCid) {
                return Vec::new();
            }
            debug!(node = %self.node_id, %alias, "defending alias against probe");
            return vec![CanFrame::rid(alias)];
        }

        if frame.is_amd() || frame.is_rid() {
            return self.on_collision(alias);
        }

        Vec::new()
    }

    fn answer_enquiry(&self, frame: &CanFrame, alias: Alias) -> Vec<CanFrame> {
        // An AME with a payload addresses one node ID only
        if let Some(wanted) = frame.node_id() {
            if wanted != self.node_id {
                return Vec::new();
            }
        }

        let reply = match self.fault {
            Some(NodeFault::TruncatedAmd) => CanFrame::control(ControlFrame::Amd, alias, &[]).ok(),
            _ => Some(CanFrame::amd(alias, self.node_id)),
        };
        let copies = if self.fault == Some(NodeFault::DuplicateAmd) { 2 } else { 1 };

        reply.into_iter().flat_map(|frame| std::iter::repeat_n(frame, copies)).collect()
    }

    fn on_collision(&mut self, lost: Alias) -> Vec<CanFrame> {
        if self.fault == Some(NodeFault::NeverRelinquish) {
            debug!(node = %self.node_id, alias = %lost, "ignoring collision");
            return Vec::new();
        }

        debug!(node = %self.node_id, alias = %lost, "alias collision, relinquishing");
        let mut frames = vec![CanFrame::amr(lost, self.node_id)];
        self.alias = None;

        if !self.reacquire {
            return frames;
        }

        let probed = match self.fault {
            Some(NodeFault::ReuseAlias) => lost,
            _ => self.fresh_alias(&[lost]),
        };
        let announced = match self.fault {
            Some(NodeFault::AnnounceUnprobed) => self.fresh_alias(&[lost, probed]),
            _ => probed,
        };

        frames.extend(
            (4..=7).rev().filter_map(|seq| CanFrame::check_id(seq, self.node_id, probed).ok()),
        );
        frames.push(CanFrame::rid(announced));
        frames.push(CanFrame::amd(announced, self.node_id));

        debug!(node = %self.node_id, alias = %announced, "re-acquired alias");
        self.alias = Some(announced);
        frames
    }

    /// Draw an alias outside `avoid` that is not the enquiry alias.
    fn fresh_alias(&mut self, avoid: &[Alias]) -> Alias {
        loop {
            let raw = self.rng.gen_range(1..=Alias::MAX);
            match Alias::new(raw) {
                Ok(alias) if !avoid.contains(&alias) && alias != Alias::QUERY => return alias,
                _ => continue,
            }
        }
    }
}
