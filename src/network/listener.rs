//! Listener abstraction
//!
//! The accept loop only needs to accept, report its address and be shut
//! down from another thread. `socket2::Socket` is the production listener.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};

use socket2::Socket;

/// A bound, listening endpoint
pub trait Listener: Send + Sync {
    /// Block until a connection arrives
    fn accept(&self) -> io::Result<(TcpStream, Option<SocketAddr>)>;

    /// Address the listener is bound to
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Stop listening, waking a blocked `accept`
    fn shutdown(&self) -> io::Result<()>;
}

impl Listener for Socket {
    fn accept(&self) -> io::Result<(TcpStream, Option<SocketAddr>)> {
        let (socket, addr) = Socket::accept(self)?;
        Ok((socket.into(), addr.as_socket()))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Socket::local_addr(self)?
            .as_socket()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not an inet socket"))
    }

    fn shutdown(&self) -> io::Result<()> {
        // On Linux this makes a blocked accept return EINVAL
        Socket::shutdown(self, Shutdown::Both)
    }
}
