//! tile-zoom - A pannable, zoomable viewer for a plane of image tiles.
//!
//! This binary indexes the tile directory, opens the window on the main
//! thread and runs the interaction, render and ticker tasks on a tokio
//! runtime.

use clap::Parser;
use parking_lot::RwLock;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tile_zoom::{
    config::Config,
    tile::{DirectorySource, ScaledTileStore, TileIndex, TileStore},
    view::{
        run_ticker, InteractionController, RedrawKind, RedrawScheduler, RenderLoop, Viewport,
        WindowBackend, DEFAULT_BACKGROUND,
    },
};

fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tile-zoom-worker")
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = run(&config, &runtime);

    // Decodes and resizes still in flight are abandoned along with the caches
    runtime.shutdown_background();
    code
}

fn run(config: &Config, runtime: &tokio::runtime::Runtime) -> ExitCode {
    info!("Configuration:");
    info!("  Tile directory: {}", config.tile_dir.display());
    info!("  Window: {}x{}", config.width, config.height);
    info!("  Tile size: {}", config.tile_size);
    info!(
        "  View: center ({}, {}), scale {} (min {})",
        config.center_x, config.center_y, config.scale, config.min_scale
    );

    // Index the tile directory
    let source = Arc::new(
        DirectorySource::new(config.tile_dir.clone()).with_strict_names(config.strict_names),
    );
    let index = match runtime.block_on(TileIndex::build(source.as_ref())) {
        Ok(index) => Arc::new(index),
        Err(e) => {
            error!("Failed to load tiles: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if index.is_empty() {
        info!("No tiles found, the view will show only the background");
    }

    // Caches
    let base = Arc::new(TileStore::new(index, source, runtime.handle().clone()));
    let scaled = Arc::new(ScaledTileStore::new(base, runtime.handle().clone()));

    let viewport = Arc::new(RwLock::new(
        Viewport::new(config.width, config.height)
            .with_tile_size(config.tile_size)
            .with_min_scale(config.min_scale)
            .with_scale(config.scale)
            .with_center(config.center_x, config.center_y),
    ));
    let scheduler = Arc::new(RedrawScheduler::new());

    // Window
    let (backend, surface, events) =
        match WindowBackend::create(config.width, config.height, &config.title) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Failed to create window: {}", e);
                return ExitCode::FAILURE;
            }
        };

    // Background is validated above
    let background = config.background_color().unwrap_or(DEFAULT_BACKGROUND);

    let interaction = InteractionController::new(
        Arc::clone(&viewport),
        Arc::clone(&scaled),
        Arc::clone(&scheduler),
    );
    let render = RenderLoop::new(Arc::clone(&scaled), Arc::clone(&viewport))
        .with_background(background)
        .with_title(config.title.clone());

    runtime.spawn(interaction.run(events));
    runtime.spawn(render.run(Arc::clone(&scheduler), surface));
    runtime.spawn(run_ticker(Arc::clone(&scheduler), config.redraw_interval()));
    scheduler.request(RedrawKind::Full);

    info!("Viewer running. Left-drag to pan, right-drag to zoom, Escape to quit.");

    let result = backend.run();
    scheduler.close();

    match result {
        Ok(()) => {
            let base = scaled.base();
            info!(
                "Shutting down: {} base tiles decoded, {} resizes started",
                base.ready_count(),
                scaled.resizes_started()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Window error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing subscriber for logging.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tile_zoom=debug"
    } else {
        "tile_zoom=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
