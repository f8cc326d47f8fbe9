use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod error;
mod integrations;
#[cfg(test)]
mod mocks;
mod models;
mod services;
mod utils;

use config::Config;
use integrations::{
    alchemy::AlchemyNftClient,
    ao::{AoClient, ProcessBus},
    irys::IrysUploader,
};
use services::{
    dex::UniswapV3Router,
    onchain::{ChainClient, EvmClient},
    AccountService, CustodyGuard, ProcessBridge, SwapExecutor, TokenRegistry,
};
use utils::parse_address;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "web3_assistant_backend=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;
    let config = Arc::new(config);

    tracing::info!("Starting web3 assistant backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Chain id: {} (mainnet: {})", config.chain_id, config.is_mainnet());

    // Static token list
    let registry = Arc::new(TokenRegistry::load(&config.token_list_path)?);

    // Clients
    let evm = EvmClient::from_config(&config)?;
    let dex = Arc::new(UniswapV3Router::new(evm.provider(), &config, &registry)?);
    let chain: Arc<dyn ChainClient> = Arc::new(evm);
    let bus: Arc<dyn ProcessBus> = Arc::new(AoClient::from_config(&config)?);
    let indexer = Arc::new(AlchemyNftClient::from_config(&config)?);
    let blobs = Arc::new(IrysUploader::from_config(&config)?);
    tracing::info!("Service wallet: {:?}", chain.service_address());

    // Services
    let executor = Arc::new(SwapExecutor::new(chain.clone(), dex, registry.clone()));
    let custody = Arc::new(CustodyGuard::new(
        chain.clone(),
        parse_address(&config.custody_address, "custody")?,
    ));
    let accounts = Arc::new(AccountService::new(
        chain.clone(),
        indexer,
        parse_address(&config.account_nft_address, "account NFT")?,
    ));
    let processes = Arc::new(ProcessBridge::new(bus.clone(), &config));

    let app_state = api::AppState {
        config: config.clone(),
        chain,
        executor: executor.clone(),
        custody,
        accounts,
        processes: processes.clone(),
        blobs,
    };

    // Build router
    let app = build_router(app_state);

    // Start background services
    tokio::spawn(services::start_background_services(
        config.clone(),
        executor,
        processes,
        bus,
    ));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Balances & prices
        .route("/balance", post(api::wallet::get_balance))
        .route(
            "/tokenListBalance",
            post(api::wallet::get_token_list_balance),
        )
        .route("/transferERC20", post(api::wallet::transfer_erc20))
        .route("/getPrice", post(api::wallet::get_price))
        // Quotes & swaps
        .route("/quote", post(api::swap::get_quote))
        .route("/multiQuote", post(api::swap::get_multi_quote))
        .route("/swap", post(api::swap::execute_swap))
        .route("/multiSwap", post(api::swap::execute_multi_swap))
        // Token-bound accounts
        .route("/createAccount", post(api::nft::create_account))
        .route("/fetchAccounts", post(api::nft::fetch_accounts))
        .route("/getOwnership", post(api::nft::get_ownership))
        // AO processes
        .route("/createProcess", post(api::process::create_process))
        .route("/runProcess", post(api::process::run_process))
        .route("/queryProcess", post(api::process::query_process))
        .route("/getProcesses", post(api::process::get_processes))
        .route("/save-chat", post(api::process::save_chat))
        // Storage
        .route(
            "/upload",
            post(api::upload::upload_file)
                .layer(DefaultBodyLimit::max(constants::MAX_UPLOAD_BYTES)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::harness;

    #[tokio::test]
    async fn upload_accepts_archives_above_default_body_limit() {
        let h = harness();
        let app = build_router(h.state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let boundary = "chat-archive-boundary";
        let file = vec![7u8; 3 * 1024 * 1024];
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"encryptedFile\"; filename=\"chat-7.zip\"\r\nContent-Type: application/zip\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(&file);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let response = reqwest::Client::new()
            .post(format!("http://{}/upload", addr))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .expect("upload request");

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let uploads = h.blobs.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0.len(), file.len());
    }
}
