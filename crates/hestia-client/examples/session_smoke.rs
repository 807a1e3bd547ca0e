/// Smoke-test for the real session factory.
///
/// Opens an ephemeral headless Chromium through `ClientSessionFactory`,
/// loads a page, and reports whether block detection fires on it.
///
/// Run with:
///   cargo run -p hestia-client --example session_smoke -- https://example.com
use hestia_client::ClientSessionFactory;
use hestia_core::block::detect_block;
use hestia_core::config::FetchConfig;
use hestia_core::models::FetchProfile;
use hestia_core::traits::{BrowsingSession, SessionFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());
    let config = FetchConfig::from_env()?;
    let factory = ClientSessionFactory::new(&config);

    println!("Launching headless browser…");
    let mut session = factory.open(FetchProfile::EphemeralBrowser).await?;
    session.navigate(&url, config.navigation_timeout).await?;
    let settled = session.settle(&["h1"], config.settle_timeout).await?;
    let html = session.content().await?;
    session.close().await;

    println!("Settled on selector: {settled}");
    println!("Got {} bytes of rendered HTML", html.len());
    match detect_block(&html) {
        Some(indicator) => println!("Block indicator: {indicator}"),
        None => println!("No block indicator"),
    }
    Ok(())
}
