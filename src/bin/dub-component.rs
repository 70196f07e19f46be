use anyhow::{anyhow, Context};
use clap::Parser;
use dub_component::cli::{config, Cli, Commands};
use dub_component::native::{build_router, init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            init_tracing();
            let settings = config::resolve_settings(&args.settings)?;
            let app = build_router(&settings).map_err(|e| anyhow!(e))?;

            let listener = tokio::net::TcpListener::bind(&args.listen)
                .await
                .with_context(|| format!("Failed to bind {}", args.listen))?;
            info!(
                addr = %args.listen,
                api_url = %settings.api_url,
                session_cookie = %settings.session_cookie,
                "listening for events"
            );
            axum::serve(listener, app).await.context("server error")?;
        }
        Commands::Config(args) => {
            let settings = config::resolve_settings(&args.settings)?;
            println!("api_key = \"{}\"", config::redact(&settings.api_key));
            println!("api_url = \"{}\"", settings.api_url);
            println!("session_cookie = \"{}\"", settings.session_cookie);
            println!("click_id_cookie = \"{}\"", settings.click_id_cookie);
        }
    }

    Ok(())
}
