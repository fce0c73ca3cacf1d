//! Driving fuses on virtual time.
//!
//! A [`VirtualClock`] replaces both the clock and the heal timers, so an hour
//! of fuse behaviour replays instantly and deterministically.

use fusebox::{Clock, FuseConfig, FuseRegistry, MemorySink, VirtualClock};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let clock = VirtualClock::new();
    let events = MemorySink::default();
    let fuses = FuseRegistry::builder().virtual_clock(clock.clone()).sink(events.clone()).build();

    fuses.install("payments", FuseConfig::new(3, Duration::from_secs(1), Duration::from_secs(60))?)?;
    fuses.install("search", FuseConfig::new(5, Duration::from_secs(10), Duration::from_secs(5))?)?;

    // A burst against payments trips it; scattered melts on search never do.
    for _ in 0..3 {
        fuses.melt("payments")?;
        fuses.melt("search")?;
        clock.elapse(Duration::from_millis(100));
    }
    clock.elapse(Duration::from_secs(20));
    fuses.melt("search")?;

    for (name, status) in fuses.statuses() {
        println!("t={:>6}ms {name}: {status}", clock.now_millis());
    }

    if let Some(deadline) = clock.deadline("payments") {
        println!("payments heals at t={deadline}ms");
    }
    clock.elapse(Duration::from_secs(60));
    println!("after one more minute, payments is {}", fuses.ask("payments")?);

    println!("\nevents:");
    for event in events.events() {
        println!("  {event}");
    }
    Ok(())
}
