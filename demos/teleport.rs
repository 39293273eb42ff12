use rsteleport::{ComposerConfig, Coordinate, FileSink, StreetViewComposer};
use std::env;
use tracing_subscriber::EnvFilter;

/// Drop a pin and fetch the Street View panorama around it.
///
/// Run with:
/// ```bash
/// GOOGLE_MAPS_API_KEY=your_key cargo run --example teleport -- 48.8584 2.2945 eiffel.jpg
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args: Vec<String> = env::args().collect();
    // Colosseum in Rome unless told otherwise
    let lat = args.get(1).map(|s| s.parse()).transpose()?.unwrap_or(41.8902);
    let lng = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(12.4922);
    let output = args.get(3).cloned().unwrap_or_else(|| "panorama.jpg".to_string());

    let config = ComposerConfig::from_env()?;
    let composer = StreetViewComposer::new(config)?.with_sink(FileSink::new(&output));

    let mut stage = composer.subscribe_stage();
    let progress = tokio::spawn(async move {
        while stage.changed().await.is_ok() {
            let current = *stage.borrow_and_update();
            println!("  stage: {current:?}");
            if current.is_terminal() {
                break;
            }
        }
    });

    println!("Teleporting to {lat}, {lng}...");
    let coordinate = Coordinate::new(lat, lng);

    match composer.compose(coordinate).await {
        Ok(composite) => {
            println!(
                "Panorama {}: {}x{} pixels",
                composite.pano_id,
                composite.width(),
                composite.height()
            );
            if let Some(height) = composite.valid_height {
                println!("Trimmed black padding, real height is {height}px");
            }
            println!("Saved to: {output}");
        }
        Err(e) if e.is_no_coverage() => println!("No street view available nearby."),
        Err(e) => println!("Failed: {e}"),
    }

    progress.await?;
    Ok(())
}
