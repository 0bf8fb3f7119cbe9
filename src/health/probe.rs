//! TCP liveness probe.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time;
use url::{Host, Url};

/// Return true if a TCP connection to `url`'s host and port opens within `timeout`.
///
/// No bytes are exchanged; the stream is closed as soon as it is established.
pub async fn probe(url: &Url, timeout: Duration) -> bool {
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => {
            tracing::warn!(url = %url, "Probe target has no host");
            return false;
        }
    };
    let Some(port) = url.port_or_known_default() else {
        tracing::warn!(url = %url, "Probe target has no port");
        return false;
    };

    match time::timeout(timeout, TcpStream::connect((host.as_str(), port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::warn!(url = %url, error = %e, "Site unreachable");
            false
        }
        Err(_) => {
            tracing::warn!(url = %url, timeout = ?timeout, "Site unreachable: connect timed out");
            false
        }
    }
}
