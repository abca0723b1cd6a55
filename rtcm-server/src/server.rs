//! `RtcmServer`: TCP fan-out of encoded RTCM messages.
//!
//! Two threads per running server. The reactor thread runs a current-thread
//! tokio runtime with the acceptor, the room, every session and the internal
//! client. The bridge thread blocks on the message queue. Callers only touch
//! the queue, so `send_message` never waits on the network.

use std::net::SocketAddr;
use std::thread::JoinHandle;

use bytes::Bytes;
use crossbeam_channel::Sender;
use futures_util::SinkExt;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::FramedWrite;
use tracing::{error, info, warn};

use crate::bridge::{spawn_bridge, SENTINEL};
use crate::envelope::EnvelopeCodec;
use crate::error::{Result, ServerError};
use crate::room::{spawn_room, SessionId};
use crate::session::run_session;

struct Running {
    local_addr: SocketAddr,
    queue: Sender<String>,
    shutdown: watch::Sender<bool>,
    reactor: JoinHandle<()>,
    bridge: JoinHandle<()>,
}

pub struct RtcmServer {
    addr: String,
    running: Option<Running>,
}

impl RtcmServer {
    /// Server that will listen on `addr` (`host:port`; port 0 picks one).
    pub fn new(addr: impl Into<String>) -> Self {
        RtcmServer {
            addr: addr.into(),
            running: None,
        }
    }

    /// Bind and start serving. Returns the bound address.
    pub fn run_server(&mut self) -> Result<SocketAddr> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let listener = std::net::TcpListener::bind(&self.addr).map_err(|source| ServerError::Bind {
            addr: self.addr.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let (queue_tx, queue_rx) = crossbeam_channel::unbounded::<String>();
        let (client_tx, client_rx) = mpsc::unbounded_channel::<Bytes>();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let reactor = std::thread::Builder::new()
            .name("rtcm-reactor".into())
            .spawn(move || {
                runtime.block_on(reactor(listener, local_addr, client_rx, shutdown_rx));
            })?;
        let bridge = match spawn_bridge(queue_rx, client_tx) {
            Ok(handle) => handle,
            Err(e) => {
                let _ = shutdown_tx.send(true);
                let _ = reactor.join();
                return Err(e.into());
            }
        };

        info!(%local_addr, "RTCM server listening");
        self.running = Some(Running {
            local_addr,
            queue: queue_tx,
            shutdown: shutdown_tx,
            reactor,
            bridge,
        });
        Ok(local_addr)
    }

    /// Stop the bridge, close the acceptor and every session, and join both
    /// threads.
    pub fn stop_server(&mut self) -> Result<()> {
        let running = self.running.take().ok_or(ServerError::NotRunning)?;

        let _ = running.queue.send(SENTINEL.to_string());
        let _ = running.shutdown.send(true);

        if running.bridge.join().is_err() {
            error!("queue bridge thread panicked");
        }
        if running.reactor.join().is_err() {
            error!("reactor thread panicked");
        }
        info!(addr = %running.local_addr, "RTCM server stopped");
        Ok(())
    }

    /// Queue a message for broadcast to all connected clients.
    pub fn send_message(&self, text: &str) -> Result<()> {
        let running = self.running.as_ref().ok_or(ServerError::NotRunning)?;
        running
            .queue
            .send(text.to_string())
            .map_err(|_| ServerError::NotRunning)
    }

    pub fn is_server_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.reactor.is_finished())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }
}

impl Drop for RtcmServer {
    fn drop(&mut self) {
        if self.running.is_some() {
            let _ = self.stop_server();
        }
    }
}

// ---------------------------------------------------------------------------
// Reactor
// ---------------------------------------------------------------------------

async fn reactor(
    listener: std::net::TcpListener,
    local_addr: SocketAddr,
    client_rx: mpsc::UnboundedReceiver<Bytes>,
    mut shutdown: watch::Receiver<bool>,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(l) => l,
        Err(e) => {
            error!("cannot register listener: {e}");
            return;
        }
    };
    let room = spawn_room();
    tokio::spawn(internal_client(local_addr, client_rx, shutdown.clone()));

    let mut next_id: SessionId = 0;
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    next_id += 1;
                    tokio::spawn(run_session(next_id, stream, room.clone(), shutdown.clone()));
                }
                Err(e) => warn!("accept failed: {e}"),
            },
            _ = shutdown.changed() => break,
        }
    }
}

/// Connects to the server like any client and sends each bridged payload in
/// an envelope.
async fn internal_client(
    addr: SocketAddr,
    mut payloads: mpsc::UnboundedReceiver<Bytes>,
    mut shutdown: watch::Receiver<bool>,
) {
    let stream = match TcpStream::connect(addr).await {
        Ok(s) => s,
        Err(e) => {
            error!(%addr, "internal client cannot connect: {e}");
            return;
        }
    };
    let (mut read_half, write_half) = stream.into_split();
    let mut sink = FramedWrite::new(write_half, EnvelopeCodec::new());

    // The room echoes our own messages back; discard them.
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        while matches!(read_half.read(&mut buf).await, Ok(n) if n > 0) {}
    });

    loop {
        tokio::select! {
            payload = payloads.recv() => match payload {
                Some(body) => {
                    if let Err(e) = sink.send(body).await {
                        match e {
                            ServerError::Envelope(reason) => warn!("message dropped: {reason}"),
                            other => {
                                error!("internal client write failed: {other}");
                                break;
                            }
                        }
                    }
                }
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::time::Duration;

    use rtcm_core::station::{mt1005, StationPosition};

    fn client(addr: SocketAddr) -> std::net::TcpStream {
        let stream = std::net::TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
    }

    #[test]
    fn test_send_message_reaches_client() {
        let mut server = RtcmServer::new("127.0.0.1:0");
        let addr = server.run_server().unwrap();
        assert!(server.is_server_running());

        let mut c = client(addr);
        let frame = mt1005(&StationPosition::new(4, 4_075_580.0, 931_853.0, 4_801_568.0));
        server.send_message(&frame.to_hex()).unwrap();

        let mut buf = vec![0u8; frame.len()];
        c.read_exact(&mut buf).unwrap();
        assert_eq!(buf, frame.as_bytes());

        server.stop_server().unwrap();
        assert!(!server.is_server_running());
    }

    #[test]
    fn test_late_joiner_gets_latest_message() {
        let mut server = RtcmServer::new("127.0.0.1:0");
        let addr = server.run_server().unwrap();

        let mut first = client(addr);
        server.send_message("D3000000").unwrap();
        let mut buf = [0u8; 4];
        first.read_exact(&mut buf).unwrap();

        let mut late = client(addr);
        let mut replay = [0u8; 4];
        late.read_exact(&mut replay).unwrap();
        assert_eq!(replay, [0xD3, 0x00, 0x00, 0x00]);

        server.stop_server().unwrap();
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut server = RtcmServer::new("127.0.0.1:0");
        assert!(!server.is_server_running());
        assert!(matches!(server.send_message("x"), Err(ServerError::NotRunning)));
        assert!(matches!(server.stop_server(), Err(ServerError::NotRunning)));

        server.run_server().unwrap();
        assert!(matches!(server.run_server(), Err(ServerError::AlreadyRunning)));
        server.stop_server().unwrap();
    }

    #[test]
    fn test_bind_failure_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let mut server = RtcmServer::new(addr.to_string());
        assert!(matches!(server.run_server(), Err(ServerError::Bind { .. })));
        assert!(!server.is_server_running());
    }

    #[test]
    fn test_stop_closes_clients() {
        let mut server = RtcmServer::new("127.0.0.1:0");
        let addr = server.run_server().unwrap();
        let mut c = client(addr);
        server.stop_server().unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(c.read(&mut buf).unwrap_or(0), 0);
    }
}
