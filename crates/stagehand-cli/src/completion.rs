use std::io::Write;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

pub(crate) fn write_completions_script(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut command = crate::Cli::command();
    clap_complete::generate(shell, &mut command, "stagehand", out);
    Ok(())
}
