/// Strata Terminal - drill core samples out of a layered terrain
///
/// Controls:
///   - WASD / Arrow Keys: Move the drill site
///   - +/-: Change drill length
///   - Space: Drill
///   - Q/ESC: Quit
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use strata_core::{build_stratigraphy, SharedStratigraphy, StrataConfig};
use strata_terminal::{
    describe_outcome, drill_site, load_config, DrillPreset, DrillSite, Scene, TerminalApp,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "strata-terminal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drill core samples out of a layered terrain", long_about = None)]
struct Cli {
    /// Scene JSON file; the built-in demo stack is used when omitted
    scene: Option<PathBuf>,

    /// Engine configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drill tolerances to use when no config file is given
    #[arg(long, value_enum, default_value_t = DrillPreset::Default, conflicts_with = "config")]
    preset: DrillPreset,

    /// Drill site X coordinate
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    x: f64,

    /// Drill site Z coordinate
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    z: f64,

    /// Drill length in meters
    #[arg(short, long, default_value_t = 20.0)]
    length: f64,

    /// Drill once, print the core sample and exit
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StrataConfig {
            drill: cli.preset.params(),
            ..StrataConfig::default()
        },
    };

    let scene = match &cli.scene {
        Some(path) => Scene::load(path).with_context(|| format!("loading scene {}", path.display()))?,
        None => Scene::demo(),
    };
    let geometries = scene.sub_geometries()?;

    let report = build_stratigraphy(&geometries, &config);
    for warning in &report.warnings {
        warn!(%warning, "Recovered while building stratigraphy");
    }
    let model = report
        .into_result()
        .with_context(|| format!("scene '{}' failed validation", scene.name))?;
    info!(scene = %scene.name, layers = model.len(), "Stratigraphy ready");

    let site = DrillSite::new(cli.x, cli.z, cli.length);

    if cli.once {
        let outcome = drill_site(&model, &site, &config.drill);
        print!("{}", describe_outcome(&site, &outcome));
        return Ok(());
    }

    let mut app = TerminalApp::new(SharedStratigraphy::new(model), config.drill, site)?;
    app.run()?;

    Ok(())
}
