//! Property tests for melt-window counting against a naive model.

use fusebox::{Clock, FuseConfig, FuseRegistry, FuseStatus, Verdict, VirtualClock};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NEVER_HEAL_MS: u64 = 1_000_000_000;

/// The fuse is blown iff, at some melt, `max_melts` melts fell within the
/// period ending at that melt.
fn model_blown(melts: &[u64], max_melts: usize, period: u64) -> bool {
    melts.iter().enumerate().any(|(i, at)| {
        let start = at.saturating_sub(period);
        melts[..=i].iter().filter(|t| **t >= start).count() >= max_melts
    })
}

proptest! {
    #[test]
    fn status_matches_window_model(
        max_melts in 1u32..6,
        period in 0u64..1500,
        gaps in prop::collection::vec(0u64..700, 1..40),
    ) {
        let clock = VirtualClock::new();
        let fuses = FuseRegistry::with_virtual_clock(clock.clone());
        let config = FuseConfig::from_millis(max_melts, period, NEVER_HEAL_MS).unwrap();
        fuses.install("db", config).unwrap();

        let mut melts = Vec::new();
        for gap in gaps {
            clock.elapse(Duration::from_millis(gap));
            fuses.melt("db").unwrap();
            melts.push(clock.now_millis());

            let expected = if model_blown(&melts, max_melts as usize, period) {
                FuseStatus::Blown
            } else {
                FuseStatus::Ok
            };
            prop_assert_eq!(fuses.ask("db").unwrap(), expected);
        }
    }

    #[test]
    fn reset_and_reinstall_always_yield_clean_ok(
        melts in 0usize..20,
        reinstall in any::<bool>(),
    ) {
        let fuses = FuseRegistry::with_virtual_clock(VirtualClock::new());
        let config = FuseConfig::from_millis(3, 1000, 60_000).unwrap();
        fuses.install("db", config).unwrap();
        for _ in 0..melts {
            fuses.melt("db").unwrap();
        }

        if reinstall {
            fuses.install("db", config).unwrap();
        } else {
            fuses.reset("db").unwrap();
        }
        let snapshot = fuses.snapshot("db").unwrap();
        prop_assert_eq!(snapshot.status, FuseStatus::Ok);
        prop_assert_eq!(snapshot.melts_recorded, 0);
    }

    #[test]
    fn run_never_invokes_op_while_blown(
        attempts in 1usize..50,
    ) {
        let fuses = FuseRegistry::with_virtual_clock(VirtualClock::new());
        fuses.install("db", FuseConfig::from_millis(1, 1000, 60_000).unwrap()).unwrap();
        fuses.melt("db").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..attempts {
            let calls = calls.clone();
            let result = fuses.run("db", move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Verdict::Pass(())
            });
            prop_assert!(result.unwrap_err().is_unavailable());
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn heals_exactly_at_reset_delay(
        reset_delay in 0u64..5000,
    ) {
        let clock = VirtualClock::new();
        let fuses = FuseRegistry::with_virtual_clock(clock.clone());
        fuses.install("db", FuseConfig::from_millis(1, 1000, reset_delay).unwrap()).unwrap();
        fuses.melt("db").unwrap();

        if reset_delay > 0 {
            clock.elapse(Duration::from_millis(reset_delay - 1));
            prop_assert_eq!(fuses.ask("db").unwrap(), FuseStatus::Blown);
            clock.elapse(Duration::from_millis(1));
        }
        prop_assert_eq!(fuses.ask("db").unwrap(), FuseStatus::Ok);
        prop_assert_eq!(fuses.snapshot("db").unwrap().melts_recorded, 0);
    }
}
