use clap::Parser;

/// Parsed command-line arguments shared by the API and worker binaries.
#[derive(Debug, Parser)]
#[command(version, about = "doc2md document to Markdown service")]
pub struct CliArgs {
    /// Path to configuration file (TOML, YAML or JSON).
    #[arg(short = 'c', long = "config-path", env = "DOC2MD_CONFIG_PATH")]
    pub config_path: Option<String>,
}

impl CliArgs {
    /// Load and validate configuration from the selected file, or from defaults
    /// and the environment.
    pub fn load_config(&self) -> anyhow::Result<doc2md_config::Config> {
        let config = doc2md_config::load_config(self.config_path.as_deref())
            .and_then(|cfg| doc2md_config::validate_config(&cfg).map(|()| cfg))
            .map_err(|e| {
                eprintln!("failed to load configuration: {e}");
                anyhow::anyhow!(e.to_string())
            })?;
        Ok(config)
    }
}
