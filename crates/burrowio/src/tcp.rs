use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::{TcpListener, TcpSocket};

pub const LISTEN_BACKLOG: u32 = 1024;

/// Resolve a bind host. `*` means every IPv4 interface.
pub fn bind_addr(host: &str, port: u16) -> io::Result<SocketAddr> {
    let host = host.trim();
    let ip: IpAddr = if host == "*" {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        host.parse().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not an IP address: {host:?}"),
            )
        })?
    };
    Ok(SocketAddr::new(ip, port))
}

/// Open a listening TCP socket with `SO_REUSEADDR` set.
///
/// Must be called from within a tokio runtime.
pub fn tcp_bind(host: &str, port: u16) -> io::Result<TcpListener> {
    let addr = bind_addr(host, port)?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}
