#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use clap::Parser;
use netprobe::{CycleRunner, MonitorConfig, ProbeExecutor, PrometheusSink, Scheduler, SnapshotWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;
mod error;
mod routes;

use cli::Cli;
use error::AppError;
use logger::init_tracing;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = MonitorConfig::from_path(&cli.config)?.with_interval_override(cli.interval)?;
    info!(
        path = %cli.config.display(),
        targets = config.targets.len(),
        probes = config.probe_count(),
        "configuration loaded"
    );
    debug!("{config}");

    let sink = Arc::new(PrometheusSink::new()?);
    let executor = ProbeExecutor::from_config(&config)?;
    let runner = CycleRunner::new(executor, sink.clone(), config.concurrency);
    let scheduler = Scheduler::new(runner, SnapshotWriter::new(&cli.results_dir), config.interval());

    if cli.once {
        let path = scheduler.run_once(&config).await?;
        info!(path = %path.display(), "snapshot written");
        return Ok(());
    }

    let server = run_metrics_server(SocketAddr::new(cli.metrics_bind, cli.metrics_port), sink)?;
    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c, stop the process another way: {e}");
            return;
        }
        info!("stop requested, finishing the current cycle");
        trigger.cancel();
    });

    scheduler.run(&config, shutdown).await;

    server_handle.stop(true).await;
    server_task.await??;

    Ok(())
}

/// Bind the scrape endpoint. The returned server still has to be polled.
fn run_metrics_server(addr: SocketAddr, sink: Arc<PrometheusSink>) -> Result<Server, AppError> {
    let sink = web::Data::from(sink);
    let server = HttpServer::new(move || App::new().app_data(sink.clone()).configure(routes::routes))
        .workers(1)
        .disable_signals()
        .bind(addr)?
        .run();

    info!(%addr, "serving metrics");
    Ok(server)
}
