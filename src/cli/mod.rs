pub mod config;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dub-component")]
#[command(about = "Forward site events to Dub lead and sale tracking")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the event endpoints over HTTP
    Serve(ServeArgs),
    /// Print the effective configuration (API key redacted)
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct SettingsArgs {
    /// Path to a TOML config file
    #[arg(long, short = 'c')]
    pub config: Option<std::path::PathBuf>,

    /// Dub API key
    #[arg(long, env = "DUB_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Dub API base URL
    #[arg(long, env = "DUB_API_URL")]
    pub api_url: Option<String>,

    /// Name of the session cookie written by this component
    #[arg(long, env = "SESSION_COOKIE_NAME")]
    pub session_cookie: Option<String>,

    /// Name of the Dub click id cookie
    #[arg(long, env = "CLICK_ID_COOKIE_NAME")]
    pub click_id_cookie: Option<String>,
}

#[derive(clap::Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = config::DEFAULT_LISTEN_ADDR)]
    pub listen: String,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
}
