//! Putting a fuse in front of a tower service.
//!
//! The backend fails every other request. With `max_melts = 2` inside a
//! five second window the fuse blows after the second failure and later
//! requests are short-circuited by the layer.

use fusebox::{FuseLayer, FuseOptions, FuseRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::{service_fn, ServiceBuilder, ServiceExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fuses = FuseRegistry::new();
    fuses.install("backend", FuseOptions::standard(2, 5_000, 30_000))?;

    let hits = Arc::new(AtomicUsize::new(0));
    let backend = {
        let hits = hits.clone();
        service_fn(move |req: String| {
            let n = hits.fetch_add(1, Ordering::SeqCst);
            async move {
                if n % 2 == 1 {
                    Err(std::io::Error::new(std::io::ErrorKind::Other, "backend timeout"))
                } else {
                    Ok(format!("echo: {req}"))
                }
            }
        })
    };

    let svc = ServiceBuilder::new().layer(FuseLayer::new(fuses.clone(), "backend")).service(backend);

    for i in 0..8 {
        match svc.clone().oneshot(format!("request-{i}")).await {
            Ok(body) => println!("{i}: {body}"),
            Err(e) if e.is_unavailable() => println!("{i}: short-circuited ({e})"),
            Err(e) => println!("{i}: backend failed ({e})"),
        }
    }

    let snapshot = fuses.snapshot("backend")?;
    println!(
        "\nbackend fuse: {} with {} melts in window; backend saw {} requests",
        snapshot.status,
        snapshot.melts_in_window,
        hits.load(Ordering::SeqCst)
    );
    Ok(())
}
