// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::path::Path;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Build the filter spec. A bare level (e.g. "debug") gets quiet defaults for
/// noisy transport crates; custom directive strings are respected as-is.
pub fn filter_spec(log_level: &str) -> String {
    let normalized = log_level.trim();
    if normalized.contains(',') || normalized.contains('=') {
        normalized.to_string()
    } else {
        format!(
            "{},h2=info,hyper=info,hyper_util=info,reqwest=info,tokio_tungstenite=info,tungstenite=info,alloy_transport_http=info,alloy_rpc_client=info",
            normalized
        )
    }
}

/// Console plus an optional daily-rotated plain-text file in `log_dir`
/// (`<file_prefix>.log.YYYY-MM-DD`). Keep the returned guard alive for the
/// whole run or buffered file lines are lost.
pub fn setup_logging(
    log_level: &str,
    json_format: bool,
    log_dir: Option<&Path>,
    file_prefix: &str,
) -> Option<WorkerGuard> {
    let spec = filter_spec(log_level);
    let make_filter = || EnvFilter::from_str(&spec).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers = Vec::new();
    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .with_filter(make_filter())
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .compact()
            .with_filter(make_filter())
            .boxed()
    };
    layers.push(console_layer);

    let mut file_error = None;
    let guard = match log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender =
                    tracing_appender::rolling::daily(dir, format!("{file_prefix}.log"));
                let (writer, guard) = tracing_appender::non_blocking(appender);
                layers.push(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true)
                        .with_filter(make_filter())
                        .boxed(),
                );
                Some(guard)
            }
            Err(e) => {
                file_error = Some(e.to_string());
                None
            }
        },
        None => None,
    };

    tracing_subscriber::registry().with(layers).init();

    let base = spec.split(',').next().unwrap_or("info");
    match (log_dir, file_error) {
        (Some(dir), None) => tracing::info!(
            "Logging initialized\n  base: {base}\n  format: {}\n  file: {}/{file_prefix}.log.<date>",
            if json_format { "json" } else { "compact" },
            dir.display()
        ),
        (Some(dir), Some(e)) => tracing::warn!(
            dir = %dir.display(),
            error = %e,
            "Log directory unavailable; logging to console only"
        ),
        (None, _) => tracing::info!(
            "Logging initialized\n  base: {base}\n  format: {}",
            if json_format { "json" } else { "compact" }
        ),
    }

    guard
}
