//! Shell completions generation command
//!
//! Usage: `rumpel completions bash > ~/.local/share/bash-completion/completions/rumpel`

use std::io;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

#[derive(Debug, clap::Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsCommand {
    pub fn execute(&self) -> Result<()> {
        let mut cmd = crate::Cli::command();
        clap_complete::generate(self.shell, &mut cmd, "rumpel", &mut io::stdout());
        Ok(())
    }
}
