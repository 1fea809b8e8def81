// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Shared tracing initialization for opbench binaries

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Initialize tracing with environment-based configuration and fallback support
///
/// - Uses `RUST_LOG` environment variable when available
/// - Falls back to provided debug flag when `RUST_LOG` is not set
/// - Writes to stderr, leaving stdout to generated program output
///
/// # Arguments
/// * `debug_fallback` - If true and `RUST_LOG` is not set, uses DEBUG level; otherwise INFO
pub fn init_tracing(debug_fallback: bool) -> Result<(), eyre::Report> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if debug_fallback { "debug" } else { "info" };
        EnvFilter::new(level)
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_file(false)
                .with_target(false)
                .with_line_number(false)
                .with_span_events(fmt::format::FmtSpan::NONE),
        )
        .with(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("Unable to initialize tracing: {e}"))?;

    Ok(())
}
