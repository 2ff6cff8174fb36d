//! Api command - run one JSON request through the dispatcher
//!
//! The request comes from the argument, or from stdin when piped.

use std::io::Read;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::{get_context, get_logger, log_event};
use zeusbank_core::api;
use zeusbank_core::LogEvent;

fn read_request(request: Option<String>) -> Result<String> {
    if let Some(raw) = request {
        return Ok(raw);
    }
    if atty::isnt(atty::Stream::Stdin) {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read request from stdin")?;
        return Ok(raw);
    }
    bail!("No request given. Pass JSON as an argument or pipe it on stdin");
}

/// Action name for logging; never the payload
fn action_of(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.get("action").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn run(request: Option<String>, compact: bool) -> Result<()> {
    let raw = read_request(request)?;
    let ctx = get_context()?;
    let logger = get_logger();
    let action = action_of(&raw);

    let response = api::handle(&ctx, &raw);

    if response.is_success() {
        log_event(&logger, LogEvent::new("api_request").with_command(&action));
        if response.is_alert() {
            log_event(
                &logger,
                LogEvent::new("large_transaction_alert").with_command(&action),
            );
        }
    } else {
        let kind = response
            .result
            .context
            .as_ref()
            .and_then(|c| c.get("kind"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        log_event(
            &logger,
            LogEvent::new("api_request_failed")
                .with_command(&action)
                .with_error(kind),
        );
    }

    let rendered = if compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };
    println!("{}", rendered);

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
