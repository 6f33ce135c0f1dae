// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the stdio binary.
//!
//! stdout is the JSON-RPC transport, so every layer writes to stderr
//! instead — logging to stdout here would corrupt the protocol stream.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LogFormat;

pub fn init_telemetry(level: &str, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log level")?;

    let registry = Registry::default().with(env_filter);

    match format {
        LogFormat::Pretty => {
            registry
                .with(fmt::layer().pretty().with_writer(std::io::stderr).with_target(true))
                .init();
        }
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr).flatten_event(true))
                .init();
        }
        LogFormat::Compact => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr).with_target(false))
                .init();
        }
    }

    tracing::info!(log_level = level, "telemetry initialized");
    Ok(())
}
