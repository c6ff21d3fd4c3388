//! Remote signing gateway entrypoint.
//!
//! Boots the dual-plane JSON-RPC server described in spec §4.11: an
//! API-key-gated listener and an mTLS-gated listener, sharing one
//! dispatcher, rate limiter, and set of registries.
//!
//! Startup installs the process-wide rustls crypto provider, loads `.env`,
//! initializes telemetry, loads configuration, then hands off to
//! [`signer_gateway::server::run`].

use signer_gateway::backend::BackendClient;
use signer_gateway::config::Config;
use signer_gateway::pipeline::ReadinessProbe;
use signer_gateway::probes::DsnPingProbe;
use signer_gateway::rate_limit::RateLimiter;
use signer_gateway::registry::api_key_registry::ApiKeyRegistry;
use signer_gateway::registry::cert_registry::CertRegistry;
use signer_gateway::registry::key_registry::KeyRegistry;
use signer_gateway::sig_down::SigDown;
use signer_gateway::state::GatewayState;
use signer_gateway::telemetry::Telemetry;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider())
        .expect("failed to install the process-wide rustls crypto provider");

    dotenvy::dotenv().ok();
    let _telemetry = Telemetry::new();

    let config = Config::load()?;

    let backend = BackendClient::try_new(
        config.backend.address.clone(),
        config.backend.credential.clone().into_inner(),
        config.timeouts.backend(),
    )?;
    let rate_limiter = RateLimiter::new(config.rate_limit.rps, config.rate_limit.burst);

    // Key, certificate, and API-key registries are populated out-of-band by
    // the external admin surfaces named out of scope in spec §1; this
    // process only reads them on the request path.
    let state = GatewayState::new(
        KeyRegistry::new(),
        CertRegistry::new(),
        ApiKeyRegistry::new(),
        backend,
        rate_limiter,
    );

    let probes: Vec<Arc<dyn ReadinessProbe>> = vec![
        Arc::new(DsnPingProbe::new(
            "relational-store",
            config.stores.relational_dsn.clone().into_inner(),
        )),
        Arc::new(DsnPingProbe::new(
            "rate-limit-store",
            config.stores.rate_limit_kv_dsn.clone().into_inner(),
        )),
    ];

    let sig_down = SigDown::try_new()?;
    let shutdown = sig_down.cancellation_token();

    signer_gateway::server::run(config, state, probes, shutdown).await?;
    Ok(())
}
