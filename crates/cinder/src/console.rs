//! Composition root and operator console
//!
//! Wires the session manager, threat aggregator, sensors and dead-man's
//! switch together, runs the periodic evaluation and inactivity tasks,
//! and drives everything from a line-oriented console. This is the only
//! place that prints; the core stays silent.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::warn;

use cinder_core::{Config, DeadManSwitch, SessionManager, ThreatAggregator};
use cinder_sensors::{FileIntegritySensor, PanicSensor, SystemLoadSensor};

pub async fn run(config: Config) -> Result<()> {
    let manager = Arc::new(SessionManager::new());
    let deadman = Arc::new(DeadManSwitch::new(Duration::from_secs(
        config.deadman_timeout_secs,
    )));
    let panic_sensor = PanicSensor::new();

    let mut aggregator = ThreatAggregator::new(config.threshold);
    aggregator.register_sensor(Box::new(SystemLoadSensor::new()));
    if let Some(dir) = &config.watch_dir {
        aggregator.register_sensor(Box::new(FileIntegritySensor::new(dir)));
    }
    aggregator.register_sensor(Box::new(panic_sensor.clone()));

    {
        let manager = Arc::clone(&manager);
        aggregator.set_breach_handler(move |level| {
            warn!(level, "threat threshold breached, burning session");
            let report = manager.burn();
            if report.was_active {
                println!("!! BREACH - session burned (threat {:.2})", level);
            }
            if let Some(residual) = report.residual {
                warn!(error = %residual, "burn left residual data on disk");
            }
        });
    }

    manager.start()?;
    println!(
        "session {} active - {} sensors, threshold {:.2}, dead-man {}s",
        manager.status().id_prefix.as_deref().unwrap_or("????????"),
        aggregator.sensor_count(),
        aggregator.threshold(),
        config.deadman_timeout_secs
    );
    print_help();

    // Threat evaluation loop; owns the aggregator, publishes the level
    let (level_tx, level_rx) = watch::channel(0.0f64);
    let poll_interval = Duration::from_millis(config.poll_interval_ms.max(1));
    let eval_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            aggregator.evaluate();
            let _ = level_tx.send(aggregator.level());
        }
    });

    // Dead-man's switch loop; burn is idempotent so one expiry burns once
    let deadman_task = tokio::spawn({
        let manager = Arc::clone(&manager);
        let deadman = Arc::clone(&deadman);
        async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                if deadman.expired() && manager.status().active {
                    warn!("dead-man's switch expired, burning session");
                    let report = manager.burn();
                    if report.was_active {
                        println!("!! INACTIVITY - session burned");
                    }
                    if let Some(residual) = report.residual {
                        warn!(error = %residual, "burn left residual data on disk");
                    }
                }
            }
        }
    });

    run_console(&manager, &deadman, &panic_sensor, level_rx).await?;

    eval_task.abort();
    deadman_task.abort();

    // Leaving the console always burns
    let report = manager.burn();
    if let Some(residual) = report.residual {
        println!("warning: residual data on disk: {}", residual);
    }
    println!("session burned, goodbye");
    Ok(())
}

async fn run_console(
    manager: &SessionManager,
    deadman: &DeadManSwitch,
    panic_sensor: &PanicSensor,
    level_rx: watch::Receiver<f64>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        deadman.touch();

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("put") => {
                let name = parts.next();
                let value = parts.collect::<Vec<_>>().join(" ");
                match name {
                    Some(name) if !value.is_empty() => match manager.store_secret(name, &value) {
                        Ok(()) => println!("stored '{}'", name),
                        Err(e) => println!("store failed: {}", e),
                    },
                    _ => println!("usage: put <name> <value>"),
                }
            }
            Some("get") => match parts.next() {
                Some(name) => match manager.retrieve_secret(name) {
                    Ok(Some(value)) => println!("{}", value),
                    Ok(None) => println!("(not found)"),
                    Err(e) => println!("retrieve failed: {}", e),
                },
                None => println!("usage: get <name>"),
            },
            Some("list") => match manager.list_secrets() {
                Ok(names) if names.is_empty() => println!("(no secrets)"),
                Ok(names) => {
                    for name in names {
                        println!("{}", name);
                    }
                }
                Err(e) => println!("list failed: {}", e),
            },
            Some("cred") => match parts.next() {
                Some(label) => {
                    let length = parts
                        .next()
                        .and_then(|s| s.parse::<usize>().ok())
                        .filter(|&n| n > 0)
                        .unwrap_or(16);
                    match manager.derive_service_credential(label, length) {
                        Some(cred) => println!("{}", cred),
                        None => println!("(no active session)"),
                    }
                }
                None => println!("usage: cred <label> [length]"),
            },
            Some("status") => {
                let status = manager.status();
                if status.active {
                    let uptime = manager
                        .started_at()
                        .map(|t| chrono::Utc::now().signed_duration_since(t).num_seconds())
                        .unwrap_or(0);
                    println!(
                        "ACTIVE  session={} threat={:.2} up={}s idle={}s",
                        status.id_prefix.as_deref().unwrap_or("????????"),
                        *level_rx.borrow(),
                        uptime,
                        deadman.idle().as_secs()
                    );
                } else {
                    println!("BURNED  threat={:.2}", *level_rx.borrow());
                }
            }
            Some("panic") => {
                // Latch the sensor for the record, then burn right away:
                // operator panic never waits for the next evaluation tick
                panic_sensor.trigger();
                let report = manager.burn();
                if report.was_active {
                    println!("!! PANIC - session burned");
                } else {
                    println!("(nothing to burn)");
                }
                if let Some(residual) = report.residual {
                    println!("warning: residual data on disk: {}", residual);
                }
            }
            Some("burn") => {
                let report = manager.burn();
                if report.was_active {
                    println!("session burned");
                } else {
                    println!("(nothing to burn)");
                }
                if let Some(residual) = report.residual {
                    println!("warning: residual data on disk: {}", residual);
                }
            }
            Some("regen") => {
                // Clear the latch first or the fresh session would burn
                // again on the next evaluation
                panic_sensor.reset();
                match manager.regenerate() {
                    Ok(report) => {
                        if let Some(residual) = report.residual {
                            println!("warning: residual data on disk: {}", residual);
                        }
                        println!(
                            "fresh session {} active",
                            manager.status().id_prefix.as_deref().unwrap_or("????????")
                        );
                    }
                    Err(e) => println!("regenerate failed: {}", e),
                }
            }
            Some("help") => print_help(),
            Some("quit") | Some("exit") => break,
            Some(other) => println!("unknown command '{}' - try 'help'", other),
            None => {}
        }
    }

    Ok(())
}

fn print_help() {
    println!("commands: put get list cred status panic burn regen help quit");
}
