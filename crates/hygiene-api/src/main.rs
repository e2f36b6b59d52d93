use hygiene_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, worker, scanner, routes)
    let (state, router) = hygiene_api::setup::initialize_app(config.clone()).await?;

    let scanner = state.scanner.clone().start(state.shutdown.clone())?;

    // Start the server
    let served =
        hygiene_api::setup::server::start_server(&config, router, state.shutdown.clone()).await;

    state.shutdown.cancel();
    if let Err(e) = scanner.await {
        tracing::error!(error = %e, "Scanner task ended abnormally");
    }

    served
}
