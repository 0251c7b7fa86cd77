use anyhow::Result;
use archsynth::cli::{init_logging, Cli, Commands};
use archsynth::commands::{self, SynthesizeConfig};
use archsynth::formatting::FormattingConfig;
use archsynth::observability::install_panic_hook;
use clap::Parser;
use std::path::Path;

fn main() -> Result<()> {
    install_panic_hook();
    let cli = Cli::parse();

    match cli.command {
        Commands::Synthesize {
            output_root,
            verbosity,
            config,
            format,
            output_dir,
            plain,
        } => {
            init_logging(verbosity);
            let formatting_config = if plain {
                FormattingConfig::plain()
            } else {
                FormattingConfig::from_env()
            };
            commands::handle_synthesize(SynthesizeConfig {
                output_root,
                config,
                format,
                output_dir,
                formatting_config,
                summary: true,
            })?;
            Ok(())
        }
        Commands::Init { force } => {
            commands::init_config(Path::new("."), force)?;
            Ok(())
        }
    }
}
