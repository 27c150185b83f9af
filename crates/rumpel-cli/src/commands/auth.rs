//! Auth commands - Login, Logout, and Status for a HAT
//!
//! Provides the `rumpel auth` CLI subcommands which:
//! 1. `login`  - Runs the browser login against the HAT, stores the token
//!    in the system keyring, and remembers the domain in config.yaml.
//! 2. `logout` - Clears the token from the keyring.
//! 3. `status` - Shows the configured HAT and whether its token is accepted.

use anyhow::{Context, Result};
use clap::Subcommand;
use rumpel_core::ports::{AuthResult, AuthSurface, HatService, TokenStatus};
use tracing::info;

use super::AppContext;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Log in to a HAT through the browser
    Login {
        /// HAT address, e.g. alice.hubofallthings.net
        #[arg(long)]
        domain: Option<String>,
    },
    /// Remove the stored token
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &mut AppContext) -> Result<()> {
        match self {
            AuthCommand::Login { domain } => execute_login(ctx, domain.as_deref()).await,
            AuthCommand::Logout => execute_logout(ctx).await,
            AuthCommand::Status => execute_status(ctx).await,
        }
    }
}

/// Execute the login flow:
/// 1. Resolve the domain from the flag or config
/// 2. Run the browser login and wait for the callback
/// 3. Store the token in the keyring
/// 4. Save the domain to config.yaml
async fn execute_login(ctx: &mut AppContext, domain: Option<&str>) -> Result<()> {
    let fmt = ctx.formatter();

    // Step 1: Resolve the HAT
    let domain = ctx.domain(domain)?;
    info!(%domain, "Starting HAT login");

    // Step 2: Browser login
    fmt.info(&format!("Opening browser to log in to {domain}..."));
    let session = ctx.session(domain.clone());
    let token = match session
        .auth
        .reauthorize(&domain)
        .await
        .context("HAT login failed")?
    {
        AuthResult::Authorized(token) => token,
        AuthResult::Cancelled => {
            fmt.warn("Login cancelled or timed out");
            return Ok(());
        }
    };

    // Step 3: Persist the token
    session.tokens.replace(token).await;

    // Step 4: Remember the domain
    if ctx.config.hat.domain.as_deref() != Some(domain.as_str()) {
        ctx.config.hat.domain = Some(domain.to_string());
        ctx.config
            .save(&ctx.config_path)
            .context("Failed to save configuration")?;
        fmt.info(&format!("Saved HAT to {}", ctx.config_path.display()));
    }

    if ctx.is_json() {
        fmt.print_json(&serde_json::json!({
            "authenticated": true,
            "domain": domain.as_str(),
        }));
    } else {
        fmt.success(&format!("Logged in to {domain}"));
    }
    Ok(())
}

/// Execute logout: clear the keyring entry for the configured HAT
async fn execute_logout(ctx: &mut AppContext) -> Result<()> {
    let fmt = ctx.formatter();

    let domain = match ctx.config.hat_domain().context("Invalid hat.domain in configuration")? {
        Some(domain) => domain,
        None => {
            fmt.info("No HAT configured. Nothing to log out.");
            return Ok(());
        }
    };

    info!(%domain, "Logging out");
    let session = ctx.session(domain.clone());
    session
        .tokens
        .clear()
        .await
        .context("Failed to clear token from keyring")?;

    fmt.success(&format!("Logged out of {domain}"));
    fmt.info("Token removed from keyring");
    Ok(())
}

/// Execute status check:
/// 1. Read the configured domain
/// 2. Look for a stored token
/// 3. Ask the HAT whether the token is still accepted
async fn execute_status(ctx: &mut AppContext) -> Result<()> {
    let fmt = ctx.formatter();

    // Step 1: Configured HAT
    let domain = match ctx.config.hat_domain().context("Invalid hat.domain in configuration")? {
        Some(domain) => domain,
        None => {
            if ctx.is_json() {
                fmt.print_json(&serde_json::json!({ "authenticated": false, "domain": null }));
            } else {
                fmt.info("Authentication status: Not configured");
                fmt.info("Run 'rumpel auth login --domain <your-hat>' to authenticate");
            }
            return Ok(());
        }
    };

    // Step 2: Stored token
    let session = ctx.session(domain.clone());
    let token_status = match session.tokens.current().await {
        None => "Not found".to_string(),
        // Step 3: Validation
        Some(token) => match session.hat.validate_token(&token).await {
            Ok(result) => {
                match session.tokens.absorb(result).await {
                    TokenStatus::Valid => "Valid".to_string(),
                    TokenStatus::Expired => "Expired".to_string(),
                }
            }
            Err(e) => format!("Unknown ({e})"),
        },
    };

    if ctx.is_json() {
        fmt.print_json(&serde_json::json!({
            "authenticated": token_status == "Valid",
            "domain": domain.as_str(),
            "token_status": token_status,
        }));
    } else {
        if token_status == "Valid" {
            fmt.success(&format!("Logged in to {domain}"));
        } else {
            fmt.warn(&format!("Not logged in to {domain}"));
        }
        fmt.info(&format!("Token status:  {token_status}"));
        fmt.info(&format!("Config:        {}", ctx.config_path.display()));
    }
    Ok(())
}
