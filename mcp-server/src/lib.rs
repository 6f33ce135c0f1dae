// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The stdio binary's library half: CLI settings, tracing, and wiring.

pub mod config;
pub mod setup;
pub mod telemetry;

pub use config::Settings;
pub use setup::initialize_app;
pub use telemetry::init_telemetry;
