use conversion_engine::core::converter::ConversionExecutor;
use conversion_engine::core::pipeline::ConversionPipeline;
use conversion_engine::core::store::{AssetStore, DirAssetStore};
use conversion_engine::core::tempfiles::TempFileManager;
use conversion_engine::settings::get_config;
use conversion_engine::{AppState, init_openapi_route};
use poem::listener::TcpListener;
use tracing::Level;

use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = Level::DEBUG;
    // Logging to File
    let file_appender = tracing_appender::rolling::daily("./logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(log_level)
        .init();

    tracing::info!("Initializing Conversion Service...");

    let config = get_config();
    tracing::info!("run with config: {:?}", config);

    let executor = ConversionExecutor::new(config.converter_bin(), config.convert_deadline());
    let temp = config
        .temp_dir
        .clone()
        .map(TempFileManager::new)
        .unwrap_or_else(TempFileManager::system);
    let pipeline = Arc::new(ConversionPipeline::new(executor, temp));
    let store: Arc<dyn AssetStore> = Arc::new(DirAssetStore::new(config.asset_dir()));

    // Init App State
    let app_state = Arc::new(AppState { pipeline, store });

    tracing::info!("Conversion pipeline initialized successfully");

    let app = init_openapi_route(app_state.clone(), &config);
    tracing::info!("run server on {}:{}", config.host, config.port);
    poem::Server::new(TcpListener::bind(format!(
        "{}:{}",
        config.host, config.port
    )))
    .run(app)
    .await?;

    Ok(())
}
