use std::path::Path;
use std::time::Duration;

use clap::Parser;
use sqlguard::cli::{Cli, Commands};
use sqlguard::config::AppConfig;
use sqlguard::error::GuardError;
use sqlguard::guard::{InspectedRequest, Outcome, ThreatScanner, sampler};
use sqlguard::server::{GuardServer, Upstream};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Start { listen, upstream } => {
            cmd_start(&cli.config, listen, upstream).await?;
        }
        Commands::Check {
            path,
            query,
            body,
            body_file,
            json,
        } => {
            let body = match body_file {
                Some(file) => Some(std::fs::read(file)?),
                None => body.map(String::into_bytes),
            };
            cmd_check(&cli.config, &path, query.as_deref(), body.as_deref(), json)?;
        }
        Commands::Patterns => {
            cmd_patterns(&cli.config)?;
        }
        Commands::Init => {
            cmd_init(&cli.config)?;
        }
    }

    Ok(())
}

async fn cmd_start(
    config_path: &Path,
    listen: Option<String>,
    upstream: Option<String>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(listen) = listen {
        config.server.listen = listen;
    }
    if let Some(upstream) = upstream {
        config.server.upstream = upstream;
    }

    // Any invalid pattern aborts here, before the listener is bound.
    let interceptor = config
        .guard
        .build_interceptor()
        .map_err(|e| config_failure(config_path, e))?;
    let upstream = Upstream::new(
        &config.server.upstream,
        Duration::from_secs(config.server.upstream_timeout_secs),
    )?;

    println!("SQLGuard starting...");
    println!("Config: {}", config_path.display());
    println!("Upstream: {}", upstream.base_url());
    println!("Patterns loaded: {}", interceptor.registry().len());

    let server = GuardServer::new(config.server.listen.clone())
        .with_interceptor(interceptor)
        .with_upstream(upstream);
    let addr = server.start().await?;
    println!("Guard running on http://{}", addr);

    // Keep running until interrupted
    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    Ok(())
}

fn cmd_check(
    config_path: &Path,
    path: &str,
    query: Option<&str>,
    body: Option<&[u8]>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let interceptor = config
        .guard
        .build_interceptor()
        .map_err(|e| config_failure(config_path, e))?;

    let path = sampler::decode_path(path);
    let request = InspectedRequest {
        path: &path,
        query,
        body,
    };
    let outcome = interceptor.intercept(&request, || Ok::<_, anyhow::Error>(()))?;

    let target = sampler::sample(&request);
    let all_matches = ThreatScanner::matching_rules(&target, interceptor.registry());

    match outcome {
        Outcome::Blocked(rejection) => {
            if json {
                let report = serde_json::json!({
                    "verdict": "blocked",
                    "status": rejection.status().as_u16(),
                    "scan": rejection.scan(),
                    "all_matches": all_matches,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let rules = interceptor.registry().rules();
                println!("BLOCKED ({})", rejection.status());
                println!("{}", rejection.message());
                for index in all_matches {
                    println!("  [{}] {}", index, rules[index].pattern());
                }
            }
        }
        Outcome::Forwarded(()) => {
            if json {
                let report = serde_json::json!({
                    "verdict": "forwarded",
                    "all_matches": all_matches,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("FORWARDED");
                println!("Scanned: {}", sampler::truncate(&target, 200));
            }
        }
    }
    Ok(())
}

fn cmd_patterns(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = config
        .guard
        .build_registry()
        .map_err(|e| config_failure(config_path, e))?;
    println!("Active patterns ({})", registry.len());
    println!("═══════════════════════════════════════");
    for (index, rule) in registry.rules().iter().enumerate() {
        println!("  [{}] {}", index, rule.pattern());
    }
    println!("Timing header: {}", config.guard.timing_header);
    Ok(())
}

fn load_config(config_path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load_or_default(config_path).map_err(|e| config_failure(config_path, e))
}

/// Name the config file in errors caused by its contents.
fn config_failure(config_path: &Path, err: GuardError) -> anyhow::Error {
    if err.is_config_error() {
        anyhow::anyhow!("Invalid configuration in {}: {}", config_path.display(), err)
    } else {
        err.into()
    }
}

fn cmd_init(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
        return Ok(());
    }

    let default_config = include_str!("../templates/sqlguard.toml");
    std::fs::write(config_path, default_config)?;
    println!("Created config: {}", config_path.display());

    println!("\nNext steps:");
    println!("  1. Point `upstream` at the application to protect");
    println!("  2. Start the guard: sqlguard start");
    Ok(())
}
