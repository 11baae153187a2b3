use std::{
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::Duration,
};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, warn};

use crate::{
    config::{LISTEN_BACKLOG, RECV_BUFFER},
    dispatch::Dispatcher,
    i18n::MessageKey,
};

/// Binds with `SO_REUSEADDR` and a short accept backlog; extra connections
/// are refused by the OS.
pub fn bind_listener(addr: &str) -> io::Result<TcpListener> {
    let addr: SocketAddr = addr.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("cannot resolve {addr}"))
    })?;
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

pub struct BankServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    idle_timeout: Duration,
}

impl BankServer {
    pub fn new(listener: TcpListener, dispatcher: Arc<Dispatcher>, idle_timeout: Duration) -> Self {
        Self {
            listener,
            dispatcher,
            idle_timeout,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop, one thread per connection. Only returns if the listener dies.
    pub fn serve(self) {
        for conn in self.listener.incoming() {
            let stream = match conn {
                Ok(stream) => stream,
                Err(err) => {
                    warn!("accept failed: {err}");
                    continue;
                }
            };
            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "?".to_string());
            let dispatcher = Arc::clone(&self.dispatcher);
            let idle = self.idle_timeout;
            let spawned = thread::Builder::new()
                .name(format!("conn-{peer}"))
                .spawn(move || handle_connection(stream, &dispatcher, idle, &peer));
            if let Err(err) = spawned {
                error!("cannot start connection thread: {err}");
            }
        }
    }
}

pub fn handle_connection(
    mut stream: TcpStream,
    dispatcher: &Dispatcher,
    idle_timeout: Duration,
    peer: &str,
) {
    info!(%peer, "client connected");
    if let Err(err) = serve_connection(&mut stream, dispatcher, idle_timeout, peer) {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                info!(%peer, "idle for {idle_timeout:?}, closing")
            }
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => info!(%peer, "client dropped the connection"),
            _ => warn!(%peer, "connection error: {err}"),
        }
    }
    let _ = stream.shutdown(Shutdown::Both);
    info!(%peer, "connection closed");
}

// Each read is one request; the loop ends on EOF or on the first I/O error.
fn serve_connection(
    stream: &mut TcpStream,
    dispatcher: &Dispatcher,
    idle_timeout: Duration,
    peer: &str,
) -> io::Result<()> {
    stream.set_read_timeout(Some(idle_timeout))?;
    stream.set_write_timeout(Some(idle_timeout))?;
    let mut buf = [0u8; RECV_BUFFER];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        let response = match std::str::from_utf8(&buf[..n]) {
            Ok(text) => {
                let line = text.trim();
                if line.is_empty() {
                    continue;
                }
                debug!(%peer, "recv: {line}");
                respond(dispatcher, line)
            }
            Err(_) => {
                warn!(%peer, "request is not valid UTF-8");
                dispatcher.malformed()
            }
        };
        debug!(%peer, "sent: {response}");
        stream.write_all(format!("{response}\n").as_bytes())?;
    }
}

fn respond(dispatcher: &Dispatcher, line: &str) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(line))).unwrap_or_else(|_| {
        error!("command panicked: {line}");
        dispatcher
            .catalog()
            .with_detail(MessageKey::Internal, "panic")
    })
}
