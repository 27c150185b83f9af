//! Config command - View and manage Rumpel configuration
//!
//! Provides the `rumpel config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Prints where the configuration file lives

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use rumpel_core::config::{Config, PlugEndpoint};
use tracing::info;

use super::AppContext;

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("hat.domain", "HAT address, or 'none'"),
    ("hat.request_timeout_secs", "Per-request timeout (seconds)"),
    ("hat.notes_take", "Notes fetched by 'notes list'"),
    ("auth.service_name", "Name shown on the HAT login page"),
    ("auth.callback_port", "Login callback port (0 = any free port)"),
    ("auth.login_timeout_secs", "Seconds to wait for the browser login"),
    ("data_plugs.directory_url", "Data plug directory base URL"),
    ("data_plugs.<name>", "Base URL of a named data plug"),
    ("offers.offer_id", "Offer claimed on plug activation"),
    ("offers.marketsquare_url", "MarketSquare base URL"),
    ("offers.app_token_name", "Application used for MarketSquare tokens"),
    ("upload.tags", "Comma-separated tags for uploaded images"),
    ("upload.max_size_mb", "Largest accepted image (MiB)"),
    ("logging.level", "trace|debug|info|warn|error"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "hat.notes_take")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Set { key, value } => execute_set(ctx, key, value),
            ConfigCommand::Validate => execute_validate(ctx),
            ConfigCommand::Path => {
                if ctx.is_json() {
                    ctx.formatter().print_json(&serde_json::json!({
                        "config_path": ctx.config_path.display().to_string(),
                        "exists": ctx.config_path.exists(),
                    }));
                } else {
                    println!("{}", ctx.config_path.display());
                }
                Ok(())
            }
        }
    }
}

fn execute_show(ctx: &AppContext) -> Result<()> {
    let fmt = ctx.formatter();
    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.is_json() {
        let json =
            serde_json::to_value(&ctx.config).context("Failed to serialize configuration")?;
        fmt.print_json(&json);
        return Ok(());
    }

    fmt.success(&format!("Configuration ({})", ctx.config_path.display()));
    fmt.info("");
    let yaml = serde_yaml::to_string(&ctx.config).context("Failed to serialize configuration")?;
    for line in yaml.lines() {
        fmt.info(line);
    }
    Ok(())
}

fn execute_set(ctx: &AppContext, key: &str, value: &str) -> Result<()> {
    let fmt = ctx.formatter();
    let mut config = ctx.config.clone();

    info!(%key, %value, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "error": e.to_string(),
            }));
        } else {
            fmt.error(&format!("Failed to set '{key}': {e}"));
            fmt.info("");
            fmt.info("Supported keys:");
            for (name, help) in SUPPORTED_KEYS {
                fmt.info(&format!("  {name:<30} - {help}"));
            }
        }
        return Ok(());
    }

    // Refuse to save a value that makes the file invalid
    let errors: Vec<String> = config
        .validate()
        .iter()
        .filter(|e| e.field.starts_with(key) || key.starts_with(&e.field))
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "errors": errors,
            }));
        } else {
            fmt.error(&format!("Invalid value for '{key}': {}", errors.join("; ")));
        }
        return Ok(());
    }

    config.save(&ctx.config_path)?;

    if ctx.is_json() {
        fmt.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": ctx.config_path.display().to_string(),
        }));
    } else {
        fmt.success(&format!("Set {key} = {value}"));
        fmt.info(&format!("Saved to {}", ctx.config_path.display()));
    }
    Ok(())
}

fn execute_validate(ctx: &AppContext) -> Result<()> {
    let fmt = ctx.formatter();
    let path = &ctx.config_path;

    // Load explicitly; the context already fell back to defaults
    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            let message = if path.exists() {
                format!("{e:#}")
            } else {
                "Configuration file not found. Using defaults.".to_string()
            };
            if ctx.is_json() {
                fmt.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": path.display().to_string(),
                    "errors": [message],
                }));
            } else if path.exists() {
                fmt.error(&message);
            } else {
                fmt.info(&format!("Configuration file not found at {}", path.display()));
                fmt.info("Using defaults. Run 'rumpel auth login --domain <your-hat>' to create one.");
            }
            return Ok(());
        }
    };

    info!(config_path = %path.display(), "Validating configuration");
    let errors = config.validate();

    if ctx.is_json() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        fmt.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": messages,
        }));
    } else if errors.is_empty() {
        fmt.success("Configuration is valid");
        fmt.info(&format!("File: {}", path.display()));
    } else {
        fmt.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        fmt.info(&format!("File: {}", path.display()));
        fmt.info("");
        for error in &errors {
            fmt.info(&format!("  {} - {}", error.field, error.message));
        }
    }
    Ok(())
}

/// Applies a dot-notation key/value pair to `config`
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let number = || value.parse::<u64>().context("Expected a positive integer");

    match key {
        // --- hat ---
        "hat.domain" => {
            config.hat.domain = match value {
                "" | "none" => None,
                domain => Some(domain.to_string()),
            };
        }
        "hat.request_timeout_secs" => config.hat.request_timeout_secs = number()?,
        "hat.notes_take" => {
            config.hat.notes_take = value
                .parse::<u32>()
                .context("Expected a positive integer")?
        }

        // --- auth ---
        "auth.service_name" => config.auth.service_name = value.to_string(),
        "auth.callback_port" => {
            config.auth.callback_port = value.parse::<u16>().context("Expected a port number")?
        }
        "auth.login_timeout_secs" => config.auth.login_timeout_secs = number()?,

        // --- data plugs ---
        "data_plugs.directory_url" => config.data_plugs.directory_url = value.to_string(),

        // --- offers ---
        "offers.offer_id" => config.offers.offer_id = value.to_string(),
        "offers.marketsquare_url" => config.offers.marketsquare_url = value.to_string(),
        "offers.app_token_name" => config.offers.app_token_name = value.to_string(),

        // --- upload ---
        "upload.tags" => {
            config.upload.tags = value
                .split(',')
                .map(|tag| tag.trim().to_string())
                .collect()
        }
        "upload.max_size_mb" => config.upload.max_size_mb = number()?,

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),

        other => match other.strip_prefix("data_plugs.") {
            Some(name) if !name.is_empty() && !name.contains('.') => {
                set_plug_url(config, name, value)
            }
            _ => bail!("Unknown configuration key: '{key}'"),
        },
    }

    Ok(())
}

/// Sets a plug's URL, adding the plug if it is new and removing it for "none"
fn set_plug_url(config: &mut Config, name: &str, url: &str) {
    let plugs = &mut config.data_plugs.plugs;
    if url.is_empty() || url == "none" {
        plugs.retain(|plug| plug.name != name);
        return;
    }
    match plugs.iter_mut().find(|plug| plug.name == name) {
        Some(plug) => plug.url = url.to_string(),
        None => plugs.push(PlugEndpoint {
            name: name.to_string(),
            url: url.to_string(),
        }),
    }
}
