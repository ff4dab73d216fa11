use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::{serve::Listener, Router};
use rustls::pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Duration;
use tokio_rustls::{server::TlsStream, TlsAcceptor};
use tracing::{error, info, warn};

use crate::{
    config::{ServerConfig, TlsConfig},
    errors::Error,
};

use super::routes::{build_router, ApiState};

pub async fn start_api_server(config: &ServerConfig, state: ApiState) -> crate::Result<()> {
    let addr: SocketAddr = config
        .socket_address()
        .parse()
        .map_err(|e| Error::config(format!("Invalid API address: {}", e)))?;

    let router: Router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::transport(format!("Failed to bind API server: {}", e)))?;

    if let Some(tls_config) = config.tls.as_ref() {
        let acceptor = configure_tls_acceptor(tls_config)?;
        info!(
            address = %addr,
            cert_path = %tls_config.cert_path.display(),
            "Starting HTTPS API server"
        );
        run_tls_server(listener, acceptor, router).await?;
    } else {
        info!(address = %addr, "Starting HTTP API server");
        run_http_server(listener, router).await?;
    }

    info!("API server shutdown completed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "API server shutdown listener failed");
    }
}

async fn run_http_server(listener: TcpListener, router: Router) -> crate::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::transport(format!("API server error: {}", e)))
}

async fn run_tls_server(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
) -> crate::Result<()> {
    let tls_listener = TlsListener::new(listener, acceptor);
    axum::serve(tls_listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::transport(format!("HTTPS API server error: {}", e)))
}

fn load_certificate_chain(path: &Path) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read certificate {}", path.display()))?;
    let chain = CertificateDer::pem_slice_iter(&bytes)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("invalid certificate PEM in {}: {}", path.display(), e))?;
    if chain.is_empty() {
        return Err(anyhow!("no certificates found in {}", path.display()));
    }
    Ok(chain)
}

fn load_private_key(path: &Path) -> anyhow::Result<PrivateKeyDer<'static>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read private key {}", path.display()))?;
    PrivateKeyDer::from_pem_slice(&bytes)
        .map_err(|e| anyhow!("invalid private key PEM in {}: {}", path.display(), e))
}

fn configure_tls_acceptor(tls: &TlsConfig) -> crate::Result<TlsAcceptor> {
    let cert_chain = load_certificate_chain(&tls.cert_path)
        .map_err(|err| Error::config(format!("TLS configuration error: {err:#}")))?;
    let private_key = load_private_key(&tls.key_path)
        .map_err(|err| Error::config(format!("TLS configuration error: {err:#}")))?;

    let provider = rustls::crypto::ring::default_provider();
    let builder = rustls::ServerConfig::builder_with_provider(provider.into())
        .with_safe_default_protocol_versions()
        .map_err(|err| Error::config(format!("Invalid TLS protocol configuration: {err}")))?;

    let server_config = builder
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|err| Error::config(format!("Failed to load TLS certificate: {err}")))?;

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

struct TlsListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    fn new(listener: TcpListener, acceptor: TlsAcceptor) -> Self {
        Self { listener, acceptor }
    }
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => match self.acceptor.accept(stream).await {
                    Ok(tls_stream) => return (tls_stream, addr),
                    Err(err) => {
                        warn!(error = %err, %addr, "TLS handshake failed");
                        continue;
                    }
                },
                Err(err) => {
                    if is_connection_error(&err) {
                        continue;
                    }
                    error!("HTTPS accept error: {err}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        self.listener.local_addr()
    }
}

fn is_connection_error(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn self_signed() -> (String, String) {
        let key = rcgen::KeyPair::generate().unwrap();
        let params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let cert = params.self_signed(&key).unwrap();
        (cert.pem(), key.serialize_pem())
    }

    #[test]
    fn test_configure_tls_acceptor_with_valid_material() {
        let (cert, key) = self_signed();
        let cert_file = write_temp(&cert);
        let key_file = write_temp(&key);

        let tls = TlsConfig {
            cert_path: cert_file.path().to_path_buf(),
            key_path: key_file.path().to_path_buf(),
        };
        assert!(configure_tls_acceptor(&tls).is_ok());
    }

    #[test]
    fn test_configure_tls_acceptor_rejects_bad_material() {
        let (cert, _) = self_signed();
        let cert_file = write_temp(&cert);
        let key_file = write_temp("not a key");

        let tls = TlsConfig {
            cert_path: cert_file.path().to_path_buf(),
            key_path: key_file.path().to_path_buf(),
        };
        let err = configure_tls_acceptor(&tls).err().expect("garbage key must be rejected");
        assert!(matches!(err, Error::Config(_)));

        let missing = TlsConfig {
            cert_path: "/nonexistent/cert.pem".into(),
            key_path: key_file.path().to_path_buf(),
        };
        let err = configure_tls_acceptor(&missing)
            .err()
            .expect("missing certificate must be rejected");
        assert!(err.to_string().contains("/nonexistent/cert.pem"));
    }

    #[test]
    fn test_connection_errors_are_retried() {
        assert!(is_connection_error(&std::io::Error::from(std::io::ErrorKind::ConnectionReset)));
        assert!(!is_connection_error(&std::io::Error::from(std::io::ErrorKind::PermissionDenied)));
    }
}
