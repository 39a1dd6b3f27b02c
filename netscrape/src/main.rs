//! `netscrape` command-line entry point.
//!
//! ```bash
//! NETSCRAPE_USERNAME=admin NETSCRAPE_PASSWORD=secret \
//!     netscrape --routers Router.txt --switches Switch.txt --format csv
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use netscrape::cli::Cli;
use netscrape::config::Settings;
use netscrape::export::default_output_path;
use netscrape::inventory::load_inventory;
use netscrape::{
    Coordinator, DeviceCollector, IcmpProbe, LivenessProber, Pipeline, SshConnector,
    TextFsmParser, VrfRegistry,
};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    let settings = Settings::from_cli(cli)?;
    if let Some(dir) = &settings.session.session_log_dir {
        std::fs::create_dir_all(dir)?;
    }
    let targets = load_inventory(&settings.routers, &settings.switches)?;
    info!("Loaded {} device(s)", targets.len());

    let parser = match &settings.template_dir {
        Some(dir) => TextFsmParser::with_template_dir(dir)?,
        None => TextFsmParser::new(),
    };
    let collector = DeviceCollector::new(
        Arc::new(SshConnector::new(settings.session.clone())),
        Arc::new(parser),
        Arc::new(VrfRegistry::new()),
    );

    let coordinator = Coordinator::new(collector).with_concurrency(settings.concurrency);
    let mut pipeline = Pipeline::new(coordinator);
    if settings.ping {
        let prober =
            LivenessProber::new(IcmpProbe::new()).with_concurrency(settings.probe_concurrency);
        pipeline = pipeline.with_prober(prober);
    }
    if let Some(path) = &settings.vrf_snapshot {
        pipeline = pipeline.with_vrf_snapshot(path);
    }

    let output = pipeline.run(targets).await;
    print!("{}", output.report);

    let exporter = settings.format.exporter();
    let path = settings.output.clone().unwrap_or_else(|| {
        default_output_path(Path::new("."), exporter.extension(), chrono::Local::now())
    });
    if let Err(e) = exporter.export(&output.bundle, &path) {
        error!("Export to {} failed: {}", path.display(), e);
        return Ok(ExitCode::FAILURE);
    }
    println!("Inventory written to {}", path.display());

    if output.report.is_total_failure() {
        error!("No device could be collected");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
