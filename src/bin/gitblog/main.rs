use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spdlog::{error, info, warn};

use gitblog::content::renderer::GfmRenderer;
use gitblog::index::synchronizer::Synchronizer;
use gitblog::index::worker::IndexWorker;
use gitblog::logger::configure_logger;
use gitblog::server::server_run;

use crate::config::{open_config, write_sample_cfg};

mod config;

const CFG_FILE_NAME: &str = "gitblog.toml";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long)]
    config_path: Option<String>,

    /// Writes a sample configuration to the given path and exits
    #[arg(long)]
    write_config: Option<String>,
}

#[ntex::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(target) = args.write_config {
        let target = PathBuf::from(target);
        write_sample_cfg(&target)
            .with_context(|| format!("Could not write sample configuration to {}", target.display()))?;
        println!("Sample configuration written to {}", target.display());
        return Ok(());
    }

    let config_path = args.config_path.map(PathBuf::from);
    let config = match open_config(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("Please run gitblog --help");
            return Ok(());
        }
    };

    if let Err(err) = configure_logger(&config) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    info!("Starting gitblog =-=-=-=-=-=-=-=-=-=-=-=-=-=-=-");
    info!("Content in {}, repositories in {}", config.paths.content_dir.display(), config.paths.repo_dir.display());

    let worker = IndexWorker::new(Synchronizer::new(&config, GfmRenderer::default()));
    let index = worker.new_handle();
    if let Err(err) = index.boot(config.boot.mode).await {
        // Whatever got indexed before the failure is still served
        error!("Boot failed: {}", err);
    }

    info!("Listening on {}:{}", config.server.address, config.server.port);
    server_run(config, index).await?;
    Ok(())
}
