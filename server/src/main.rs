use config::{Config, File};
use server::AppState;
use std::sync::Arc;
use tracing::info;

fn load_config() -> anyhow::Result<(String, u16, AppState)> {
    let settings = Config::builder()
        .add_source(File::with_name("config").required(false))
        .build()?;

    let host: String = settings
        .get("host")
        .unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = settings.get("port").unwrap_or(4242);

    let upstream_base_url: String = settings
        .get("upstream_base_url")
        .unwrap_or_else(|_| "https://api.a4f.co/v1".to_string());
    let provider_prefix: Option<String> = settings.get("provider_prefix").ok();

    info!(
        "Proxying to {}/chat/completions (model prefix: {:?})",
        upstream_base_url.trim_end_matches('/'),
        provider_prefix
    );

    Ok((
        host,
        port,
        AppState {
            upstream_base_url,
            provider_prefix,
        },
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("Initializing messages proxy server");

    let (host, port, state) = load_config()?;
    let app = server::get_app(Arc::new(state));

    info!("Routes configured, binding to {host}:{port}");
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    info!("Server started successfully, listening at http://{host}:{port}/v1/messages");

    axum::serve(listener, app).await?;

    Ok(())
}
