//! Guarding a flaky database call with a named fuse.
//!
//! Three failures within one second blow the `db` fuse; further queries are
//! rejected without touching the database until the two second reset delay
//! has passed.

use fusebox::{FuseOptions, FuseRegistry, LogSink, RunError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct DbError(&'static str);

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "database error: {}", self.0)
    }
}

impl std::error::Error for DbError {}

async fn query(attempts: Arc<AtomicUsize>) -> Result<u64, DbError> {
    let n = attempts.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(10)).await;
    if n < 3 {
        Err(DbError("connection refused"))
    } else {
        Ok(42)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(true).init();

    let fuses = FuseRegistry::builder().sink(LogSink).build();
    fuses.install("db", FuseOptions::standard(3, 1_000, 2_000))?;
    let attempts = Arc::new(AtomicUsize::new(0));

    for round in 1..=6 {
        let result = fuses.run_result_async("db", || query(attempts.clone())).await;
        match result {
            Ok(rows) => println!("round {round}: ok ({rows} rows)"),
            Err(RunError::Inner(e)) => println!("round {round}: failed and melted ({e})"),
            Err(RunError::Fuse(e)) => println!("round {round}: not attempted ({e})"),
        }
    }
    println!("database attempts so far: {}", attempts.load(Ordering::SeqCst));

    println!("waiting for the fuse to heal...");
    tokio::time::sleep(Duration::from_millis(2_100)).await;

    let rows = fuses.run_result_async("db", || query(attempts.clone())).await?;
    println!("after heal: ok ({rows} rows), status {}", fuses.ask("db")?);
    Ok(())
}
