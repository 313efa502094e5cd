#![cfg_attr(not(debug_assertions), deny(warnings))]

use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};

use anyhow::Context;
use derive_new::new;
use dotenvy::dotenv;
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use serde_json::Value;
use tracing::{Level, error, info};

use crate::event_handler::EventHandler;
use crate::extractor::RecordExtractor;
use crate::s3_event::InvocationResult;

mod event_handler;
mod extractor;
mod s3_event;

async fn function_handler(
    event: LambdaEvent<Value>,
    extractor: &impl EventHandler,
) -> Result<InvocationResult, Error> {
    info!(request_id = %event.context.request_id, "Invocation started");

    Ok(handle_event(&event.payload, extractor).await)
}

/// Runs the handler and turns any fault into the 500 result, so the runtime
/// never sees an invocation error.
async fn handle_event(
    payload: &Value,
    extractor: &impl EventHandler,
) -> InvocationResult {
    match extractor.process_event(payload).await {
        Ok(result) => result,
        Err(error) => {
            let backtrace = Backtrace::force_capture();
            error!(
                { %payload, ?backtrace, error = format!("{:?}", error) },
                "Error in event handler"
            );

            InvocationResult::internal_error(&format!("{error:#}"))
        }
    }
}

#[derive(new, Debug)]
struct Config {
    log_level: Level,
    event_path: PathBuf,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let log_level = match std::env::var("LOG_LEVEL") {
            Ok(level) => level.parse().context("LOG_LEVEL")?,
            Err(_) => Level::INFO,
        };

        let event_path = std::env::var("EVENT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                Path::new(env!("CARGO_MANIFEST_DIR")).join("event.json")
            });

        Ok(Config::new(log_level, event_path))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    if cfg!(debug_assertions) {
        if let Err(error) = dotenv() {
            if !error.not_found() {
                return Err(error.into());
            }
        }
    }

    let config = Config::from_env()?;

    if cfg!(debug_assertions) {
        color_eyre::install()?;
        tracing_subscriber::fmt()
            .pretty()
            .with_max_level(config.log_level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(config.log_level)
            // disable printing the name of the module in every log line.
            .with_target(false)
            // disabling time is handy because CloudWatch will add the ingestion time.
            .without_time()
            .init();
    }

    let extractor = RecordExtractor::new();

    if cfg!(debug_assertions) {
        let event_json = std::fs::read_to_string(&config.event_path)
            .with_context(|| config.event_path.display().to_string())?;

        let event: Value = serde_json::from_str(event_json.as_str())?;

        let result = handle_event(&event, &extractor).await;

        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        run(service_fn(|event| function_handler(event, &extractor))).await?;
    }

    Ok(())
}
