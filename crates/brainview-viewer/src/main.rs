//! Brainview desktop binary
//!
//! Opens the viewer in a native window, reading configuration and the model
//! from disk.

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(name = "brainview")]
#[command(about = "Interactive anatomical brain viewer")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "brainview.toml")]
    config: std::path::PathBuf,

    /// Model to load (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Start in menu or hover mode (overrides config)
    #[arg(long)]
    mode: Option<brainview_core::ViewMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the effective region table as TOML and exit
    #[arg(long)]
    print_regions: bool,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use brainview_viewer::LaunchOptions;
    use tracing::{info, Level};
    use tracing_subscriber::EnvFilter;

    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins; otherwise keep the GPU stack quiet
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},wgpu=warn,naga=warn", level)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Brainview v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = brainview_core::load_config(&args.config)?;

    let options = LaunchOptions {
        model: args.model,
        mode: args.mode,
        config: None,
    };

    if args.print_regions {
        let table = config.region_table(options.mode_or(&config))?;
        print!("{}", table.to_toml()?);
        return Ok(());
    }

    info!(
        model = %options.model_or(&config),
        mode = options.mode_or(&config).label(),
        "Configuration loaded"
    );

    brainview_viewer::run_with(config, options);
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
