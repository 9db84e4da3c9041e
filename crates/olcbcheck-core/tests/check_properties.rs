//! Property tests for the collision check state machine.
//!
//! These drive `CollisionCheck` directly with generated frame sequences; no
//! link or clock is involved.

use olcbcheck_core::{CheckAction, CheckError, CheckPhase, CheckerConfig, CollisionCheck};
use olcbcheck_proto::{Alias, CanFrame, NodeId};
use proptest::prelude::*;

const TARGET: u64 = 0x0501_0101_0301;

fn target() -> NodeId {
    NodeId::from(TARGET)
}

fn alias(raw: u16) -> Alias {
    Alias::new(raw).unwrap()
}

/// Drive a fresh check up to `AwaitReprobe` with the target on `original`.
fn collided(original: Alias) -> CollisionCheck {
    let mut check = CollisionCheck::new(&CheckerConfig::default());
    check.start().unwrap();
    check.handle_frame(&CanFrame::amd(original, target())).unwrap();
    check.handle_frame(&CanFrame::rid(original)).unwrap();
    check.handle_frame(&CanFrame::amr(original, target())).unwrap();
    check
}

fn any_alias() -> impl Strategy<Value = Alias> {
    (1u16..=0xFFF).prop_map(alias)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn reprobing_original_alias_always_fails(original in any_alias()) {
        let mut check = collided(original);
        let result = check.handle_frame(&CanFrame::cid7(target(), original));
        prop_assert_eq!(result, Err(CheckError::ReprobedOriginalAlias { alias: original }));
    }

    #[test]
    fn reannouncing_original_alias_always_fails(
        original in any_alias(),
        with_cid in proptest::bool::ANY,
    ) {
        let mut check = collided(original);
        if with_cid {
            // Claim some other alias first; the original must still be refused
            let other = alias(if original.get() == 0xFFF { 1 } else { original.get() + 1 });
            check.handle_frame(&CanFrame::cid7(target(), other)).unwrap();
        } else {
            check.handle_timeout().unwrap();
        }

        let result = check.handle_frame(&CanFrame::amd(original, target()));
        prop_assert_eq!(result, Err(CheckError::OriginalAliasReannounced { alias: original }));
    }

    #[test]
    fn short_amd_always_fails(len in 0usize..6, phase_index in 0usize..3, raw in 1u16..=0xFFF) {
        let header = 0x1070_1000 | u32::from(raw);
        let short = CanFrame::new(header, &vec![0xAA; len]).unwrap();

        let mut check = collided(alias(5));
        let expected_phase = match phase_index {
            0 => {
                check = CollisionCheck::new(&CheckerConfig::default());
                check.start().unwrap();
                CheckPhase::Identify
            },
            1 => {
                check.handle_timeout().unwrap();
                CheckPhase::AwaitReannounce
            },
            _ => {
                check.handle_timeout().unwrap();
                check.handle_timeout().unwrap();
                CheckPhase::Verify
            },
        };

        let result = check.handle_frame(&short);
        prop_assert_eq!(result, Err(CheckError::MissingNodeId { phase: expected_phase, header }));
        prop_assert_eq!(check.phase(), CheckPhase::Failed);
    }

    #[test]
    fn final_count_cross_checks_reannouncement(
        reannounce in proptest::bool::ANY,
        replies in 0usize..4,
    ) {
        let mut check = collided(alias(5));
        check.handle_timeout().unwrap();
        if reannounce {
            check.handle_frame(&CanFrame::amd(alias(9), target())).unwrap();
        } else {
            check.handle_timeout().unwrap();
        }
        prop_assert_eq!(check.phase(), CheckPhase::Verify);

        for _ in 0..replies {
            check.handle_frame(&CanFrame::amd(alias(9), target())).unwrap();
        }

        let expected = usize::from(reannounce);
        let result = check.handle_timeout();
        if replies == expected {
            let completed = matches!(result.as_deref(), Ok([CheckAction::Complete(_)]));
            prop_assert!(completed);
        } else {
            prop_assert_eq!(
                result,
                Err(CheckError::AmdCountMismatch { target: target(), expected, observed: replies })
            );
        }
    }

    #[test]
    fn reserved_alias_never_counts_as_replacement(
        fragment in 0u32..=0xFFF,
        announce in proptest::bool::ANY,
    ) {
        let mut check = collided(alias(5));
        let header = if announce {
            check.handle_timeout().unwrap();
            0x1070_1000
        } else {
            0x1700_0000 | (fragment << 12)
        };
        let frame = CanFrame::new(header, &target().to_bytes()).unwrap();

        let result = check.handle_frame(&frame);
        let rejected =
            matches!(result, Err(CheckError::ReservedAlias { header: h, .. }) if h == header);
        prop_assert!(rejected);
        prop_assert_eq!(check.phase(), CheckPhase::Failed);
        prop_assert_eq!(check.new_alias(), None);
        prop_assert!(!check.reannounced());
    }

    #[test]
    fn foreign_traffic_never_fails_optional_phases(
        headers in proptest::collection::vec(0x1900_0000u32..0x1A00_0000, 0..16),
    ) {
        let mut check = collided(alias(5));
        check.handle_timeout().unwrap();

        // OpenLCB message frames are neither CID nor AMD
        for header in headers {
            let frame = CanFrame::new(header, &[]).unwrap();
            prop_assert_eq!(check.handle_frame(&frame), Ok(vec![]));
        }
        prop_assert_eq!(check.phase(), CheckPhase::AwaitReannounce);
    }
}
