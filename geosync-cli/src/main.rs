//! GeoSync CLI - Command-line interface
//!
//! Runs one offline sync against a feature service: captures an extent,
//! downloads a region snapshot into the scratch directory, and prints
//! the offline layers the snapshot provides.

use clap::{Parser, ValueEnum};
use geosync::config::SyncConfig;
use geosync::extent::{Extent, Viewport};
use geosync::job::JobOutcome;
use geosync::map::MemoryMap;
use geosync::orchestrator::SyncOrchestrator;
use geosync::scratch::ScratchDirectory;
use geosync::service::{FeatureServiceClient, ReqwestClient, TrustPolicy};
use geosync::store::LayerOrder;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, ValueEnum)]
enum LayerOrderArg {
    /// Reverse of service declaration order (default display convention)
    Reverse,
    /// Service declaration order as-is
    Declared,
}

#[derive(Parser)]
#[command(name = "geosync")]
#[command(version = geosync::VERSION)]
#[command(about = "Download an offline snapshot of a feature service", long_about = None)]
struct Args {
    /// Feature service base URL
    #[arg(long)]
    service_url: String,

    /// Center latitude in decimal degrees
    #[arg(long, requires = "lon", conflicts_with = "bbox")]
    lat: Option<f64>,

    /// Center longitude in decimal degrees
    #[arg(long, requires = "lat", conflicts_with = "bbox")]
    lon: Option<f64>,

    /// Map scale for the center-point extent (e.g. 250000)
    #[arg(long, default_value = "250000")]
    scale: f64,

    /// Explicit extent as xmin,ymin,xmax,ymax (WGS-84 degrees)
    #[arg(long, value_delimiter = ',', num_args = 4)]
    bbox: Option<Vec<f64>>,

    /// Scratch directory for downloaded snapshots
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Export status poll interval in milliseconds
    #[arg(long, default_value = "500")]
    poll_interval_ms: u64,

    /// Overall job deadline in seconds
    #[arg(long, default_value = "300")]
    timeout_secs: u64,

    /// Include feature attachments in the snapshot
    #[arg(long)]
    include_attachments: bool,

    /// Layer presentation order
    #[arg(long, value_enum, default_value = "reverse")]
    layer_order: LayerOrderArg,

    /// Accept any server certificate (dev/test only)
    #[arg(long)]
    trust_any_host: bool,
}

fn resolve_viewport(args: &Args) -> Result<Viewport, String> {
    if let Some(bbox) = &args.bbox {
        // clap enforces num_args = 4.
        let extent = Extent::new(bbox[0], bbox[1], bbox[2], bbox[3])
            .map_err(|e| format!("invalid bbox: {e}"))?;
        return Ok(Viewport::showing(extent));
    }
    match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Viewport::centered_on(lat, lon, args.scale)
            .map_err(|e| format!("invalid center point: {e}")),
        _ => Err("provide either --bbox or --lat/--lon".to_string()),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let viewport = match resolve_viewport(&args) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let config = SyncConfig::new()
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
        .with_job_timeout(Duration::from_secs(args.timeout_secs))
        .with_include_attachments(args.include_attachments)
        .with_layer_order(match args.layer_order {
            LayerOrderArg::Reverse => LayerOrder::ReverseDeclared,
            LayerOrderArg::Declared => LayerOrder::Declared,
        })
        .with_trust_policy(if args.trust_any_host {
            TrustPolicy::TrustAnyHost
        } else {
            TrustPolicy::Strict
        });

    let http = match ReqwestClient::new(config.http_timeout(), config.trust_policy()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error creating HTTP client: {e}");
            process::exit(1);
        }
    };
    let client = FeatureServiceClient::new(&args.service_url, http);

    let scratch_path = args
        .scratch_dir
        .unwrap_or_else(|| std::env::temp_dir().join("geosync-scratch"));
    let scratch = match ScratchDirectory::prepare(&scratch_path) {
        Ok(scratch) => scratch,
        Err(e) => {
            eprintln!("Error preparing scratch directory: {e}");
            process::exit(1);
        }
    };

    let mut orchestrator = SyncOrchestrator::new(client, scratch, config);

    let mut map = MemoryMap::new();
    map.set_viewport(viewport);
    if let Err(e) = orchestrator.stage_online_layers(&mut map).await {
        eprintln!("Error loading service descriptor: {e}");
        process::exit(1);
    }

    println!("Service: {}", args.service_url);
    println!("Online layers:");
    for layer in map.layers() {
        println!("  {}", layer.name);
    }
    println!();

    let mut handle = match orchestrator.start_sync(&map).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error starting sync: {e}");
            process::exit(1);
        }
    };
    println!("Downloading snapshot to {}", handle.destination().display());

    // Ctrl-C cancels the job; the terminal outcome reports Canceled.
    let cancel_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCanceling...");
            cancel_handle.cancel();
        }
    });

    let mut progress_rx = handle.progress_watch();
    let progress_printer = tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let fraction = *progress_rx.borrow();
            print!("\rProgress: {:>3.0}%", fraction * 100.0);
            use std::io::Write;
            let _ = std::io::stdout().flush();
        }
    });

    let outcome = handle.wait().await;
    let _ = progress_printer.await;
    println!();

    match outcome {
        JobOutcome::Succeeded(gdb) => {
            println!("Snapshot ready: {}", gdb.path().display());
            orchestrator.stage_offline_layers(&gdb, &mut map);
            println!("Offline layers:");
            for layer in map.layers() {
                println!("  {}", layer.name);
            }
            debug!(tables = gdb.feature_tables().len(), "sync complete");
        }
        JobOutcome::Failed(e) => {
            eprintln!("Sync failed: {e}");
            process::exit(1);
        }
        JobOutcome::Canceled => {
            println!("Sync canceled");
            process::exit(130);
        }
    }
}
