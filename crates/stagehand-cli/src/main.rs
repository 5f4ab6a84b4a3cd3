use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stagehand_core::OperationError;
use stagehand_graph::GraphError;

mod completion;
mod console;
mod flows;
mod render;

use crate::console::CliConsole;
use crate::flows::{
    run_feature_pack_remove_command, run_install_command, run_update_apply_command,
    run_update_list_command, run_update_prepare_command,
};

pub(crate) const SUCCESS: u8 = 0;
pub(crate) const INVALID_ARGUMENTS: u8 = 1;
pub(crate) const PROCESSING_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "stagehand")]
#[command(about = "Update lifecycle manager for provisioned server distributions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Install {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long = "channel-manifest")]
        channel_manifest: String,
        #[arg(long = "repository")]
        repositories: Vec<String>,
        #[arg(long = "feature-pack")]
        feature_pack: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    #[command(subcommand)]
    Update(UpdateCommands),
    #[command(subcommand)]
    FeaturePack(FeaturePackCommands),
    Completions {
        shell: clap_complete::Shell,
    },
    Version,
}

#[derive(Subcommand, Debug)]
enum FeaturePackCommands {
    Remove {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long = "fpl")]
        feature_pack: String,
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum UpdateCommands {
    Prepare {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long = "candidate-dir")]
        candidate_dir: PathBuf,
        #[arg(long = "repository")]
        repositories: Vec<String>,
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    Apply {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long = "candidate-dir")]
        candidate_dir: PathBuf,
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    List {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long = "repository")]
        repositories: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                INVALID_ARGUMENTS
            } else {
                SUCCESS
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    match run_cli(cli) {
        Ok(()) => ExitCode::from(SUCCESS),
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::from(return_code_for(&err))
        }
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Install {
            dir,
            channel_manifest,
            repositories,
            feature_pack,
            config,
            yes,
        } => {
            let console = CliConsole::new(yes);
            run_install_command(
                &dir,
                &channel_manifest,
                &repositories,
                feature_pack.as_deref(),
                config.as_deref(),
                &console,
            )
        }
        Commands::Update(UpdateCommands::Prepare {
            dir,
            candidate_dir,
            repositories,
            yes,
        }) => {
            let console = CliConsole::new(yes);
            run_update_prepare_command(&dir, &candidate_dir, &repositories, &console)
        }
        Commands::Update(UpdateCommands::Apply {
            dir,
            candidate_dir,
            yes,
        }) => {
            let console = CliConsole::new(yes);
            run_update_apply_command(&dir, &candidate_dir, &console)
        }
        Commands::Update(UpdateCommands::List { dir, repositories }) => {
            let console = CliConsole::new(true);
            run_update_list_command(&dir, &repositories, &console)
        }
        Commands::FeaturePack(FeaturePackCommands::Remove {
            dir,
            feature_pack,
            yes,
        }) => {
            let console = CliConsole::new(yes);
            run_feature_pack_remove_command(&dir, &feature_pack, &console)
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            completion::write_completions_script(shell, &mut stdout)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

pub(crate) fn return_code_for(err: &anyhow::Error) -> u8 {
    if let Some(operation) = err.downcast_ref::<OperationError>() {
        return match operation {
            OperationError::Resolution { .. }
            | OperationError::Apply { .. }
            | OperationError::CorruptInstallation { .. } => PROCESSING_ERROR,
            _ => INVALID_ARGUMENTS,
        };
    }
    if err.downcast_ref::<GraphError>().is_some() {
        return INVALID_ARGUMENTS;
    }
    PROCESSING_ERROR
}

#[cfg(test)]
mod tests;
