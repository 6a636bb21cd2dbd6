use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use stockpick_core::config::Settings;
use stockpick_core::RecommendationService;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "stockpick", about = "Buy/Sell/Hold recommendations for listed Indian companies")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score one or more companies concurrently and print the recommendations as JSON.
    Recommend {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the normalized company record without scoring it.
    Raw { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let service = Arc::new(
        RecommendationService::from_settings(&settings).context("failed to build service")?,
    );

    match args.command {
        Command::Recommend { names } => recommend(service, names).await,
        Command::Raw { name } => {
            let data = service
                .raw_data(&name)
                .await
                .map_err(anyhow::Error::from)
                .inspect_err(|err| {
                    sentry_anyhow::capture_anyhow(err);
                })?;
            println!("{}", serde_json::to_string_pretty(&*data)?);
            Ok(())
        }
    }
}

async fn recommend(service: Arc<RecommendationService>, names: Vec<String>) -> anyhow::Result<()> {
    let mut tasks = tokio::task::JoinSet::new();
    for (idx, name) in names.iter().cloned().enumerate() {
        let service = service.clone();
        tasks.spawn(async move { (idx, service.recommend(&name).await) });
    }

    let mut results = vec![serde_json::Value::Null; names.len()];
    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (idx, res) = joined.context("recommendation task panicked")?;
        results[idx] = match res {
            Ok(rec) => serde_json::to_value(&rec)?,
            Err(err) => {
                failures += 1;
                tracing::error!(company = %err.company(), error = %err, "recommendation failed");
                if err.is_retryable() {
                    sentry_anyhow::capture_anyhow(&anyhow::Error::from(err.clone()));
                }
                json!({
                    "company_name": err.company(),
                    "error": err.to_string(),
                    "retryable": err.is_retryable(),
                })
            }
        };
    }

    println!("{}", serde_json::to_string_pretty(&results)?);

    let stats = service.cache_stats();
    tracing::info!(
        size = stats.size,
        hits = stats.hits,
        misses = stats.misses,
        "cache stats"
    );
    eprintln!("{}", json!({ "cache": stats }));

    if failures == names.len() {
        anyhow::bail!("all {failures} recommendation requests failed");
    }
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
