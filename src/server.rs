//! Dual-plane server: two concurrently running HTTPS listeners sharing one
//! dispatcher, rate limiter, and set of registries (spec §4.11, C11).

use crate::config::{ClientAuthMode, Config};
use crate::pipeline::{self, ClientCertDer, Plane, ReadinessProbe};
use crate::state::GatewayState;
use axum::Router;
use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use rustls::crypto::ring::{cipher_suite, default_provider};
use rustls::crypto::CryptoProvider;
use rustls::server::danger::ClientCertVerifier;
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig as RustlsServerConfig};
use rustls_pki_types::CertificateDer;
use std::fs;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_rustls::server::TlsStream;
use tokio_util::sync::CancellationToken;
use tower_http::add_extension::AddExtension;

/// Drain deadline for graceful shutdown: stop accepting, let outstanding
/// requests finish, then force-close (spec §4.11).
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(30);

/// Errors that can occur while standing up the dual-plane server. Listener
/// bind failures are fatal at startup (spec §4.11).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to load TLS material for the {plane} plane: {source}")]
    TlsConfig {
        plane: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{plane} plane server error: {source}")]
    Serve {
        plane: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Runs both listeners to completion, returning once both have drained and
/// shut down (spec §4.11 shutdown semantics).
pub async fn run(
    config: Config,
    state: GatewayState,
    probes: Vec<Arc<dyn ReadinessProbe>>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let api_key_router = pipeline::router(
        state.clone(),
        Plane::ApiKey,
        config.timeouts.request(),
        probes.clone(),
    );
    let mtls_router = pipeline::router(
        state.clone(),
        Plane::Mtls,
        config.timeouts.request(),
        probes,
    );

    let api_key_addr = SocketAddr::new(config.api_key_plane.host, config.api_key_plane.port);
    let api_key_handle = axum_server::Handle::new();
    let api_key_task = tokio::spawn({
        let handle = api_key_handle.clone();
        async move {
            tracing::info!(%api_key_addr, "starting API-key plane listener");
            axum_server::bind(api_key_addr)
                .handle(handle)
                .serve(api_key_router.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
    });

    let mtls_handle = axum_server::Handle::new();
    let mtls_task = if config.mtls_plane.enabled {
        let tls_config = load_mtls_rustls_config(&config).await?;
        let mtls_addr = SocketAddr::new(config.mtls_plane.host, config.mtls_plane.port);
        let acceptor = ClientCertAcceptor {
            inner: RustlsAcceptor::new(tls_config),
        };
        let handle = mtls_handle.clone();
        Some(tokio::spawn(async move {
            tracing::info!(%mtls_addr, "starting mTLS plane listener");
            axum_server::bind(mtls_addr)
                .acceptor(acceptor)
                .handle(handle)
                .serve(mtls_router.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }))
    } else {
        tracing::warn!("mTLS plane disabled by configuration");
        None
    };

    shutdown.cancelled().await;
    tracing::info!("shutdown signal received, draining in-flight requests");

    api_key_handle.graceful_shutdown(Some(SHUTDOWN_DRAIN));
    if mtls_task.is_some() {
        mtls_handle.graceful_shutdown(Some(SHUTDOWN_DRAIN));
    }

    api_key_task
        .await
        .expect("API-key listener task panicked")
        .map_err(|source| ServerError::Serve { plane: "api-key", source })?;

    if let Some(mtls_task) = mtls_task {
        mtls_task
            .await
            .expect("mTLS listener task panicked")
            .map_err(|source| ServerError::Serve { plane: "mtls", source })?;
    }

    Ok(())
}

/// Builds the mTLS listener's `rustls::ServerConfig`: loads the server
/// identity and CA bundle from disk, enforces TLS 1.2+ with a fixed
/// cipher-suite allow-list, and wires the configured [`ClientAuthMode`]
/// into a `WebPkiClientVerifier` (spec §4.11).
async fn load_mtls_rustls_config(config: &Config) -> Result<RustlsConfig, ServerError> {
    let server_cert_path = config.mtls_plane.server_cert_path.clone();
    let server_key_path = config.mtls_plane.server_key_path.clone();
    let ca_cert_path = config.mtls_plane.ca_cert_path.clone();
    let client_auth_mode = config.mtls_plane.client_auth_mode;

    tokio::task::spawn_blocking(move || {
        build_rustls_server_config(&server_cert_path, &server_key_path, &ca_cert_path, client_auth_mode)
    })
    .await
    .expect("mTLS config-loading task panicked")
    .map(RustlsConfig::from_config)
}

fn build_rustls_server_config(
    server_cert_path: &std::path::Path,
    server_key_path: &std::path::Path,
    ca_cert_path: &std::path::Path,
    client_auth_mode: ClientAuthMode,
) -> Result<Arc<RustlsServerConfig>, ServerError> {
    let io_err = |source: io::Error| ServerError::TlsConfig { plane: "mtls", source };
    let parse_err = |msg: String| {
        ServerError::TlsConfig { plane: "mtls", source: io::Error::new(io::ErrorKind::InvalidData, msg) }
    };

    let cert_chain = load_certs(server_cert_path).map_err(io_err)?;
    let key = load_private_key(server_key_path).map_err(io_err)?;
    let ca_roots = load_root_store(ca_cert_path).map_err(io_err)?;

    let verifier = build_client_verifier(ca_roots, client_auth_mode).map_err(parse_err)?;

    let provider = Arc::new(cipher_suite_allow_list());
    let builder = RustlsServerConfig::builder_with_provider(provider)
        .with_protocol_versions(rustls::ALL_VERSIONS)
        .map_err(|e| parse_err(e.to_string()))?;

    let mut server_config = builder
        .with_client_cert_verifier(verifier)
        .with_single_cert(cert_chain, key)
        .map_err(|e| parse_err(e.to_string()))?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(server_config))
}

/// Selects a fixed allow-list of AEAD cipher suites spanning TLS 1.2 and
/// TLS 1.3 (spec §4.11: "enforces ... a fixed cipher-suite allow-list").
fn cipher_suite_allow_list() -> CryptoProvider {
    let mut provider = default_provider();
    provider.cipher_suites = vec![
        cipher_suite::TLS13_AES_256_GCM_SHA384,
        cipher_suite::TLS13_AES_128_GCM_SHA256,
        cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        cipher_suite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    ];
    provider
}

fn load_certs(path: &std::path::Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let bytes = fs::read(path)?;
    rustls_pemfile::certs(&mut bytes.as_slice()).collect()
}

fn load_private_key(path: &std::path::Path) -> io::Result<rustls_pki_types::PrivateKeyDer<'static>> {
    let bytes = fs::read(path)?;
    rustls_pemfile::private_key(&mut bytes.as_slice())?
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no private key found in PEM file"))
}

fn load_root_store(ca_cert_path: &std::path::Path) -> io::Result<RootCertStore> {
    let certs = load_certs(ca_cert_path)?;
    let mut roots = RootCertStore::empty();
    for cert in certs {
        roots
            .add(cert)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    }
    Ok(roots)
}

/// Maps a configured [`ClientAuthMode`] onto the corresponding
/// `WebPkiClientVerifier` construction (spec §4.6). `None` disables client
/// authentication entirely (no certificate is even requested); the other
/// four modes all request a certificate at the TLS layer and differ only
/// in whether presenting one is mandatory and whether it must chain to the
/// configured CA -- this gateway treats "any" the same as "verified" since
/// it has no other trust anchor to fall back to, a simplification recorded
/// in DESIGN.md.
fn build_client_verifier(
    roots: RootCertStore,
    mode: ClientAuthMode,
) -> Result<Arc<dyn ClientCertVerifier>, String> {
    let roots = Arc::new(roots);
    match mode {
        ClientAuthMode::None => Ok(WebPkiClientVerifier::no_client_auth()),
        ClientAuthMode::Request | ClientAuthMode::VerifyIfGiven => {
            WebPkiClientVerifier::builder(roots)
                .allow_unauthenticated()
                .build()
                .map_err(|e| e.to_string())
        }
        ClientAuthMode::RequireAny | ClientAuthMode::RequireAndVerify => {
            WebPkiClientVerifier::builder(roots).build().map_err(|e| e.to_string())
        }
    }
}

/// Wraps [`RustlsAcceptor`] to pull the verified peer certificate chain out
/// of the completed TLS handshake and inject the leaf's DER bytes as a
/// request extension, where [`crate::auth::mtls`] reads it (spec §4.5 step 1).
///
/// This is not itself a client-auth *policy* -- the listener's
/// [`ClientAuthMode`] (configured on the `rustls::ServerConfig` built for
/// this acceptor) decides whether a handshake without a client certificate
/// is even allowed to complete.
#[derive(Clone)]
struct ClientCertAcceptor {
    inner: RustlsAcceptor,
}

impl<I, S> Accept<I, S> for ClientCertAcceptor
where
    I: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = TlsStream<I>;
    type Service = AddExtension<S, Option<ClientCertDer>>;
    type Future =
        Pin<Box<dyn Future<Output = io::Result<(Self::Stream, Self::Service)>> + Send>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let accept_future = self.inner.accept(stream, service);
        Box::pin(async move {
            let (stream, service) = accept_future.await?;
            let leaf = stream
                .get_ref()
                .1
                .peer_certificates()
                .and_then(peer_certificates_leaf)
                .map(ClientCertDer);
            let service = AddExtension::new(service, leaf);
            Ok((stream, service))
        })
    }
}

fn peer_certificates_leaf(certs: &[CertificateDer<'static>]) -> Option<Vec<u8>> {
    certs.first().map(|c| c.as_ref().to_vec())
}
