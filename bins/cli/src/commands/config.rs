//! Config command handlers.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{exit_code_for, format_error_output};
use buildpool_config::{load_scheduler_config_std_env, to_pretty_json};
use std::path::Path;

/// Run `config show`: load the effective config from env/file/overrides and print it.
pub fn run_config_show(
    mode: OutputMode,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let validated = match load_scheduler_config_std_env(path, overrides_json) {
        Ok(validated) => validated,
        Err(error) => return Ok(format_error_output(mode, &error, exit_code_for(&error))),
    };

    let config_json = to_pretty_json(validated.as_ref()).map_err(|error| {
        CliError::InvalidInput(format!("failed to render config: {error}"))
    })?;

    let stdout = if mode.is_ndjson() {
        format_config_ndjson(&config_json)?
    } else if mode.is_json() {
        format_config_json(path, &config_json)?
    } else {
        format_config_text(path, &config_json)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

/// Run `config validate`: same loading path as `show`, but only reports ok/error.
pub fn run_config_validate(
    mode: OutputMode,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    if let Err(error) = load_scheduler_config_std_env(path, overrides_json) {
        return Ok(format_error_output(mode, &error, exit_code_for(&error)));
    }

    let stdout = if mode.is_ndjson() {
        let mut output = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "config",
        }))?;
        output.push('\n');
        output
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        path.map_or_else(
            || "status: ok\nconfig: ok\n".to_string(),
            |path| format!("status: ok\nconfig: ok\npath: {}\n", path.to_string_lossy()),
        )
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_config_json(path: Option<&Path>, config_json: &str) -> Result<String, CliError> {
    let config_value: serde_json::Value = serde_json::from_str(config_json.trim())?;
    let payload = serde_json::json!({
        "status": "ok",
        "configPath": path.map(|value| value.to_string_lossy().to_string()),
        "effectiveConfig": config_value,
    });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}

fn format_config_ndjson(config_json: &str) -> Result<String, CliError> {
    let config_value: serde_json::Value = serde_json::from_str(config_json.trim())?;
    let payload = serde_json::json!({
        "type": "summary",
        "status": "ok",
        "kind": "config",
        "effectiveConfig": config_value,
    });
    let mut output = serde_json::to_string(&payload)?;
    output.push('\n');
    Ok(output)
}

fn format_config_text(path: Option<&Path>, config_json: &str) -> String {
    let mut out = String::new();
    out.push_str("status: ok\n");
    if let Some(path) = path {
        out.push_str("path: ");
        out.push_str(&path.to_string_lossy());
        out.push('\n');
    }
    out.push_str("config:\n");
    out.push_str(config_json);
    out
}
