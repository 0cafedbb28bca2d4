use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rulehub_adapter_virtual::VirtualHome;
use rulehub_app::RuleEngine;
use rulehub_app::ports::TelemetrySink;
use rulehubd::actions::ActionExecutor;
use rulehubd::config::{self, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    let engine = Arc::new(RuleEngine::new(config.engine_config()));
    if let Some(path) = &config.engine.rules_file {
        let rules = config::load_rules(path)?;
        tracing::info!(path = %path.display(), count = rules.len(), "loaded rules file");
        for rule in rules {
            engine.add_rule(rule);
        }
    }

    let home = Arc::new(VirtualHome::default());
    let sink: Weak<dyn TelemetrySink> = Arc::downgrade(&engine) as Weak<dyn TelemetrySink>;
    engine.on_rule_execution(ActionExecutor::new(
        home.clone(),
        sink,
        tokio::runtime::Handle::current(),
    ));

    let stats = engine.get_stats();
    tracing::info!(
        rules = stats.total_rules,
        enabled = stats.enabled_rules,
        simulator = config.simulator.enabled,
        "rulehubd started"
    );

    if config.simulator.enabled {
        let period = Duration::from_millis(config.simulator.interval_ms);
        tokio::select! {
            () = home.run(engine.as_ref(), period) => {}
            signal = shutdown_signal() => signal?,
        }
    } else {
        shutdown_signal().await?;
    }

    engine.stop();
    let stats = engine.get_stats();
    tracing::info!(
        triggers = stats.dispatch.triggers_processed,
        fired = stats.dispatch.rules_fired,
        failures = stats.dispatch.handler_failures,
        "rulehubd stopped"
    );
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
        _ = terminate.recv() => {}
    }
    tracing::info!("shutdown requested");
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown requested");
    Ok(())
}
