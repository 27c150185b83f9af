//! Terminal implementation of the interaction port
//!
//! Prompts are read from stdin on a blocking thread so the runtime keeps
//! serving other tasks. Everything is written to stderr, leaving stdout
//! to command results.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use anyhow::Context;
use rumpel_core::ports::{Alert, Choice, Interaction, Prompt};
use tracing::{debug, warn};

/// Asks and tells the user through the terminal
pub struct TerminalInteraction {
    /// Answer every prompt with "proceed" without asking
    assume_yes: bool,
    /// Last progress percentage printed, to avoid redrawing the same value
    last_percent: AtomicU8,
}

impl TerminalInteraction {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            last_percent: AtomicU8::new(u8::MAX),
        }
    }
}

/// Reads one line from stdin
async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        Some(line)
    })
    .await
    .ok()
    .flatten()
}

fn parse_answer(answer: &str, prompt: &Prompt) -> Choice {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("y")
        || answer.eq_ignore_ascii_case("yes")
        || answer.eq_ignore_ascii_case(&prompt.proceed_label)
    {
        Choice::Proceed
    } else {
        Choice::Cancel
    }
}

fn render_prompt(prompt: &Prompt) -> String {
    let mut text = String::new();
    if !prompt.title.is_empty() {
        text.push_str(&prompt.title);
        text.push('\n');
    }
    text.push_str(&prompt.message);
    text.push_str(&format!(
        " [y = {}, N = {}] ",
        prompt.proceed_label, prompt.cancel_label
    ));
    text
}

fn render_alert(alert: &Alert) -> String {
    if alert.title.is_empty() {
        format!("\u{26a0} {}", alert.message)
    } else {
        format!("\u{26a0} {}: {}", alert.title, alert.message)
    }
}

#[async_trait::async_trait]
impl Interaction for TerminalInteraction {
    async fn confirm(&self, prompt: &Prompt) -> Choice {
        if self.assume_yes {
            debug!(message = %prompt.message, "Auto-confirming prompt");
            return Choice::Proceed;
        }

        eprint!("{}", render_prompt(prompt));
        let _ = io::stderr().flush();

        match read_line().await {
            Some(answer) => parse_answer(&answer, prompt),
            None => Choice::Cancel,
        }
    }

    async fn alert(&self, alert: &Alert) {
        eprintln!("{}", render_alert(alert));
    }

    async fn present_authorization(&self, url: &str) -> anyhow::Result<()> {
        eprintln!("Opening the authorization page:");
        eprintln!("  {url}");
        if let Err(e) = webbrowser::open(url) {
            warn!(error = %e, "Could not open a browser");
        }

        if self.assume_yes {
            return Ok(());
        }

        eprint!("Press Enter once you have finished in the browser... ");
        io::stderr().flush().context("Failed to write to terminal")?;
        read_line()
            .await
            .map(|_| ())
            .context("Failed to read from terminal")
    }

    fn progress(&self, fraction: f64) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u8;
        if self.last_percent.swap(percent, Ordering::Relaxed) == percent {
            return;
        }
        eprint!("\rUploading image... {percent:>3}%");
        if percent >= 100 {
            eprintln!();
        }
        let _ = io::stderr().flush();
    }
}
