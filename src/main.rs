// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use stitch_pipeline::backends::local::LocalHandlerFactory;
use stitch_pipeline::config::consts::STORAGE_SOURCE;
use stitch_pipeline::config::{load_and_validate_config, EnvSecretsProvider};
use stitch_pipeline::engine::{PipelineController, WorkerReport};
use stitch_pipeline::events::{EventEnvelope, IngestionDetail};
use stitch_pipeline::logging::init_tracing;

/// Upper bound on how long to wait for the pipeline to drain
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <config.yaml> <bucket> <key> [<key> ...]", args[0]);
        eprintln!("Example: {} configs/stitch-pipeline.yaml docs jdtest/a.pdf jdtest/b.pdf", args[0]);
        std::process::exit(1);
    }

    init_tracing();

    let config_file = &args[1];
    let bucket = &args[2];
    let keys = &args[3..];

    let handlers = LocalHandlerFactory::handler_map();
    let topology = load_and_validate_config(config_file, &handlers)
        .with_context(|| format!("failed to load {config_file}"))?;
    let controller = PipelineController::new(topology, &handlers, &EnvSecretsProvider)
        .context("failed to wire pipeline")?;

    println!("🧵 Stitch Pipeline");
    println!("═══════════════════");
    println!("Config: {}", config_file);
    for stage in controller.topology().stages() {
        let marker = if stage.enabled { "✓" } else { "·" };
        println!("  {} {:<24} -> {}", marker, stage.name, stage.queue_name);
    }
    println!();

    let start_time = Instant::now();
    let handle = controller.start();

    for key in keys {
        let upload = EventEnvelope::object_created(STORAGE_SOURCE, &IngestionDetail::new(bucket, key));
        let receipt = controller.publish(upload).await?;
        if receipt.is_unmatched() {
            println!("⚠️  s3://{}/{} matched no stage", bucket, key);
        } else {
            println!("📥 s3://{}/{} -> {}", bucket, key, receipt.destinations.join(", "));
        }
    }

    let drained = tokio::select! {
        idle = controller.wait_until_idle(IDLE_TIMEOUT) => idle,
        _ = tokio::signal::ctrl_c() => {
            println!("\n🛑 Interrupted");
            false
        }
    };

    let reports = handle.shutdown().await;
    let elapsed = start_time.elapsed();

    println!();
    if drained {
        println!("✅ Pipeline drained in {:.2?}", elapsed);
    } else {
        println!("⏱️  Stopped after {:.2?} with work outstanding", elapsed);
    }

    print_queue_stats(&controller).await;
    print_worker_totals(&reports);
    print_dead_letters(&controller).await?;

    Ok(())
}

async fn print_queue_stats(controller: &PipelineController) {
    println!("\n📊 Queues:");
    println!(
        "  {:<24} {:>7} {:>9} {:>6} {:>8} {:>7} {:>5} {:>6}",
        "stage", "waiting", "in-flight", "acked", "released", "expired", "dead", "purged"
    );
    for (stage, stats) in controller.stats().await {
        println!(
            "  {:<24} {:>7} {:>9} {:>6} {:>8} {:>7} {:>5} {:>6}",
            stage,
            stats.waiting,
            stats.in_flight,
            stats.acknowledged,
            stats.released,
            stats.expired_leases,
            stats.dead_lettered,
            stats.purged
        );
    }
}

fn print_worker_totals(reports: &[WorkerReport]) {
    let completed: u64 = reports.iter().map(|r| r.completed).sum();
    let failed: u64 = reports.iter().map(|r| r.failed).sum();
    let timed_out: u64 = reports.iter().map(|r| r.timed_out).sum();
    println!(
        "\n👷 {} workers: {} completed, {} failed, {} timed out",
        reports.len(),
        completed,
        failed,
        timed_out
    );
}

async fn print_dead_letters(controller: &PipelineController) -> Result<()> {
    let records = controller
        .dead_letters()
        .await
        .context("failed to read dead letters")?;

    if records.is_empty() {
        println!("\n🪦 No dead letters");
        return Ok(());
    }

    println!("\n🪦 Dead letters ({}):", records.len());
    for record in records {
        println!(
            "  {} [{}] {} after {} deliveries: {}",
            record.queue,
            record.envelope.detail_type(),
            record.envelope.document_id().unwrap_or("<no document_id>"),
            record.delivery_count,
            record.last_error.as_deref().unwrap_or("<no error recorded>")
        );
    }
    Ok(())
}
