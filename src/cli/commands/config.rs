use azrg_mcp::config::{self, types::Settings};

use crate::cli::OutputFormat;

#[derive(clap::Args)]
pub struct ConfigArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

pub fn run(args: ConfigArgs, settings: &Settings) -> anyhow::Result<()> {
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), settings)?;
            println!();
        }
        OutputFormat::Human => {
            println!("# {}", config::config_path().display());
            let toml_str = toml::to_string_pretty(settings)?;
            println!("{}", toml_str);
        }
    }

    Ok(())
}
