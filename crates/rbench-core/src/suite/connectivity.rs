use std::net::SocketAddr;
use std::time::{Duration, Instant};

use reqwest::Url;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_native_tls::native_tls;

use crate::results::ConnectivityResult;

fn ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Time DNS resolution, the TCP connect and, for `https` targets, the TLS
/// handshake against the host of `target_url`.
///
/// Never fails: a failed phase stops the measurement, leaves `connected`
/// false and records which phase broke in `error`. Phases that ran keep
/// their timings.
pub async fn measure_connectivity(
    target_url: &str,
    limit: Duration,
    accept_invalid_certs: bool,
) -> ConnectivityResult {
    let mut result = ConnectivityResult {
        dns_ms: 0.0,
        tcp_ms: 0.0,
        tls_ms: None,
        total_ms: 0.0,
        connected: false,
        error: None,
    };

    let url = match Url::parse(target_url) {
        Ok(url) => url,
        Err(e) => {
            result.error = Some(format!("parse URL: {e}"));
            return result;
        }
    };
    let Some(host) = url.host_str().map(|h| h.trim_matches(['[', ']']).to_string()) else {
        result.error = Some("URL has no host".to_string());
        return result;
    };
    let Some(port) = url.port_or_known_default() else {
        result.error = Some(format!("no default port for scheme {}", url.scheme()));
        return result;
    };

    let started = Instant::now();
    let resolved = timeout(limit, tokio::net::lookup_host((host.as_str(), port))).await;
    result.dns_ms = ms(started.elapsed());
    let addr: SocketAddr = match resolved {
        Ok(Ok(mut addrs)) => match addrs.next() {
            Some(addr) => addr,
            None => {
                result.error = Some("DNS lookup returned no addresses".to_string());
                return result;
            }
        },
        Ok(Err(e)) => {
            result.error = Some(format!("DNS lookup failed: {e}"));
            return result;
        }
        Err(_) => {
            result.error = Some("DNS lookup timed out".to_string());
            return result;
        }
    };

    let started = Instant::now();
    let connected = timeout(limit, TcpStream::connect(addr)).await;
    result.tcp_ms = ms(started.elapsed());
    let stream = match connected {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            result.error = Some(format!("TCP connection failed: {e}"));
            return result;
        }
        Err(_) => {
            result.error = Some("TCP connection timed out".to_string());
            return result;
        }
    };

    if url.scheme() == "https" {
        let connector = match native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
        {
            Ok(c) => tokio_native_tls::TlsConnector::from(c),
            Err(e) => {
                result.error = Some(format!("TLS setup failed: {e}"));
                return result;
            }
        };

        let started = Instant::now();
        let handshake = timeout(limit, connector.connect(&host, stream)).await;
        result.tls_ms = Some(ms(started.elapsed()));
        match handshake {
            Ok(Ok(_tls)) => {}
            Ok(Err(e)) => {
                result.error = Some(format!("TLS handshake failed: {e}"));
                return result;
            }
            Err(_) => {
                result.error = Some("TLS handshake timed out".to_string());
                return result;
            }
        }
    }

    result.total_ms = result.dns_ms + result.tcp_ms + result.tls_ms.unwrap_or(0.0);
    result.connected = true;
    tracing::info!(
        dns_ms = result.dns_ms,
        tcp_ms = result.tcp_ms,
        tls_ms = ?result.tls_ms,
        "connectivity measured"
    );
    result
}
