//! Async driver for the collision check.
//!
//! Executes [`CheckAction`]s against a [`FrameLink`] and turns the link's
//! bounded reads into the machine's two inputs: a frame, or silence.
//!
//! # Timing
//!
//! - Every read waits at most `read_timeout`. A read that times out is
//!   silence.
//! - Every phase gets a deadline of `phase_budget`, fixed when the phase is
//!   entered. Once it passes, the phase sees silence even if the bus is still
//!   busy, so a chatty segment cannot keep a phase alive forever.
//! - A purge reads until the bus is quiet, within the same budget.

use olcbcheck_proto::CanFrame;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::{
    checker::{CheckAction, CheckPhase, CheckReport, CollisionCheck},
    config::CheckerConfig,
    error::{CheckError, LinkError},
    link::FrameLink,
};

/// Run one collision check over `link`.
///
/// # Errors
///
/// Returns the first failure: a protocol violation, a missing mandatory
/// frame, or a link failure.
pub async fn run_check<L: FrameLink>(
    link: &mut L,
    config: &CheckerConfig,
) -> Result<CheckReport, CheckError> {
    let mut check = CollisionCheck::new(config);
    let mut actions = check.start()?;
    let mut phase: Option<CheckPhase> = None;
    let mut deadline = Instant::now();

    let result = loop {
        for action in actions {
            match action {
                CheckAction::Purge => {
                    let discarded = purge(link, config).await?;
                    trace!(discarded, "purged link");
                },
                CheckAction::SendFrame(frame) => {
                    debug!(%frame, "sending");
                    link.send_frame(frame).await?;
                },
                CheckAction::Complete(report) => return Ok(report),
            }
        }

        // Phase clock starts once the phase's own frames are on the bus
        if phase != Some(check.phase()) {
            phase = Some(check.phase());
            deadline = Instant::now() + config.phase_budget;
            debug!(phase = %check.phase(), "waiting");
        }

        let step = match next_frame(link, config, deadline).await {
            Ok(Some(frame)) => check.handle_frame(&frame),
            Ok(None) => check.handle_timeout(),
            Err(err) => break Err(CheckError::from(err)),
        };

        match step {
            Ok(next) => actions = next,
            Err(err) => break Err(err),
        }
    };

    if let Err(err) = &result {
        warn!(phase = %check.phase(), error = %err, "check failed");
    }
    result
}

/// Read one frame, waiting no longer than the read timeout or the deadline.
async fn next_frame<L: FrameLink>(
    link: &mut L,
    config: &CheckerConfig,
    deadline: Instant,
) -> Result<Option<CanFrame>, LinkError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        debug!("phase budget exhausted");
        return Ok(None);
    }

    let frame = link.recv_frame(config.read_timeout.min(remaining)).await?;
    if let Some(frame) = &frame {
        debug!(%frame, "received");
    }
    Ok(frame)
}

/// Discard queued frames until the bus goes quiet.
async fn purge<L: FrameLink>(link: &mut L, config: &CheckerConfig) -> Result<usize, LinkError> {
    let deadline = Instant::now() + config.phase_budget;
    let mut discarded = 0;

    while let Some(frame) = next_frame(link, config, deadline).await? {
        trace!(%frame, "discarding stale frame");
        discarded += 1;
    }
    Ok(discarded)
}

/// Run a check and log the verdict.
///
/// Thin wrapper over [`run_check`] for binaries.
pub async fn run_and_report<L: FrameLink>(
    link: &mut L,
    config: &CheckerConfig,
) -> Result<CheckReport, CheckError> {
    let report = run_check(link, config).await?;
    info!(
        target_node = %report.target,
        original_alias = %report.original_alias,
        new_alias = ?report.new_alias.map(|alias| alias.to_string()),
        reannounced = report.reannounced,
        "Passed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use olcbcheck_proto::{Alias, NodeId};
    use tokio::sync::mpsc;

    use super::*;
    use crate::link::ChannelLink;

    fn alias(raw: u16) -> Alias {
        Alias::new(raw).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn silent_bus_fails_in_first_part() {
        let (_in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let mut link = ChannelLink::new(in_rx, out_tx);

        let err = run_check(&mut link, &CheckerConfig::default()).await.unwrap_err();
        assert_eq!(err, CheckError::Timeout { phase: CheckPhase::Identify });

        // The enquiry went out before the wait
        assert_eq!(out_rx.recv().await, Some(CanFrame::ame(Alias::QUERY)));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_frames_are_purged_before_enquiry() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, _out_rx) = mpsc::channel(8);
        let mut link = ChannelLink::new(in_rx, out_tx);

        // An AMD queued before the check starts must not be taken as the answer
        let node = NodeId::from(0x0501_0101_0301_u64);
        in_tx.send(CanFrame::amd(alias(5), node)).await.unwrap();

        let err = run_check(&mut link, &CheckerConfig::default()).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_link_is_not_a_check_failure() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, _out_rx) = mpsc::channel(8);
        let mut link = ChannelLink::new(in_rx, out_tx);
        drop(in_tx);

        let err = run_check(&mut link, &CheckerConfig::default()).await.unwrap_err();
        assert_eq!(err, CheckError::Link(LinkError::Closed));
        assert!(!err.is_check_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn chatty_bus_cannot_stall_a_phase() {
        let (in_tx, in_rx) = mpsc::channel(1024);
        let (out_tx, _out_rx) = mpsc::channel(8);
        let mut link = ChannelLink::new(in_rx, out_tx);

        // Unrelated traffic every 100ms, forever
        let noise = tokio::spawn(async move {
            let frame = CanFrame::new(0x1917_0123, &[]).unwrap();
            while in_tx.send(frame.clone()).await.is_ok() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });

        let config = CheckerConfig { phase_budget: Duration::from_secs(2), ..Default::default() };
        let started = Instant::now();
        let err = run_check(&mut link, &config).await.unwrap_err();

        assert_eq!(err, CheckError::Timeout { phase: CheckPhase::Identify });
        // One budget for the purge, one for the Identify phase
        assert!(started.elapsed() <= Duration::from_secs(4) + config.read_timeout);
        noise.abort();
    }
}
