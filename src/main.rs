use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::net::TcpListener;
use tracing::info;

use fundscope_backend::app;
use fundscope_backend::config::{AppConfig, ProviderChoice};
use fundscope_backend::external::eastmoney::EastmoneyFundProvider;
use fundscope_backend::external::etf_kline::EtfKlineProvider;
use fundscope_backend::external::fallback_provider::FallbackProvider;
use fundscope_backend::external::mock_provider::MockProvider;
use fundscope_backend::external::nav_provider::NavProvider;
use fundscope_backend::logging::{init_logging, LoggingConfig};
use fundscope_backend::services::nav_service::NavService;
use fundscope_backend::state::AppState;

fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn NavProvider>> {
    let timeout = config.http_timeout;

    let provider: Arc<dyn NavProvider> = match config.provider {
        ProviderChoice::OpenFund => {
            info!("📊 Using NAV provider: open-end fund data only");
            Arc::new(EastmoneyFundProvider::new(timeout)?)
        }
        ProviderChoice::Etf => {
            info!("📊 Using NAV provider: ETF klines only");
            Arc::new(EtfKlineProvider::new(timeout)?)
        }
        ProviderChoice::Multi => {
            info!("📊 Using NAV provider: open-end fund data with ETF fallback");
            let primary = Box::new(EastmoneyFundProvider::new(timeout)?);
            let fallback = Box::new(EtfKlineProvider::new(timeout)?);
            Arc::new(FallbackProvider::new(primary, fallback))
        }
        ProviderChoice::Mock => {
            info!("📊 Using NAV provider: offline mock data");
            Arc::new(MockProvider::new())
        }
    };

    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env().map_err(|e| anyhow!(e))?;
    config.validate().map_err(|e| anyhow!(e))?;

    let provider = build_provider(&config).context("Failed to create NAV provider")?;
    let nav = NavService::new(provider, config.retry);
    info!(
        "Scoring mode: {:?}, retries: {} x {}ms",
        config.scoring_mode,
        config.retry.max_attempts,
        config.retry.base_delay.as_millis()
    );

    let addr = config.bind_addr;
    let app = app::create_app(AppState::new(nav, config));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Fundscope backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
