use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::commands::CommandResult;
use crate::error::CliError;

/// Stable JSON shape for every command.
#[derive(Debug, Serialize)]
struct Document<'a> {
    data: &'a Value,
    meta: Meta<'a>,
}

#[derive(Debug, Serialize)]
struct Meta<'a> {
    command: &'a str,
    latency_ms: u64,
    /// True when any part of `data` was synthesized.
    degraded: bool,
    warnings: &'a [String],
}

pub fn render(result: &CommandResult, pretty: bool) -> Result<(), CliError> {
    let document = Document {
        data: &result.data,
        meta: Meta {
            command: result.command,
            latency_ms: result.latency_ms,
            degraded: !result.warnings.is_empty(),
            warnings: &result.warnings,
        },
    };

    let payload = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{payload}")?;
    Ok(())
}
