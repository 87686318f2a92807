use anyhow::{Context, Result};
use listenfd::ListenFd;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Pending-connection queue. The status surface sees a handful of pollers,
/// not bursts.
const LISTEN_BACKLOG: i32 = 128;

/// The socket handed over by the service manager, if any. Otherwise bind
/// `ip:port` ourselves.
pub fn create_listener(ip: IpAddr, port: u16) -> Result<TcpListener> {
    if let Some(listener) = inherited_listener()? {
        return Ok(listener);
    }
    bind_reusable(SocketAddr::new(ip, port))
}

fn inherited_listener() -> Result<Option<TcpListener>> {
    let Some(std_listener) = ListenFd::from_env().take_tcp_listener(0)? else {
        return Ok(None);
    };
    std_listener.set_nonblocking(true)?;
    let listener = TcpListener::from_std(std_listener)?;
    info!(addr = ?listener.local_addr().ok(), "Monitor API on inherited socket");
    Ok(Some(listener))
}

/// Bind with SO_REUSEADDR (and SO_REUSEPORT on unix) so a restarted daemon
/// does not wait out TIME_WAIT on its old port.
fn bind_reusable(addr: SocketAddr) -> Result<TcpListener> {
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into()).with_context(|| format!("cannot bind monitor API to {}", addr))?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(TcpListener::from_std(socket.into())?)
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal_name = tokio::select! {
        () = ctrl_c => "Ctrl+C",
        () = terminate => "SIGTERM",
    };
    info!(signal = signal_name, "Stopping monitor API");
}
