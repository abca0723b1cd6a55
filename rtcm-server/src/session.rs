//! One connected client.
//!
//! Inbound enveloped messages go to the room; everything the room queues for
//! this session is written back one message at a time, in order, without the
//! envelope header. Any I/O error or EOF closes only this session.

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::envelope::{EnvelopeCodec, Inbound};
use crate::room::{RoomHandle, SessionId};

pub async fn run_session(id: SessionId, stream: TcpStream, room: RoomHandle, mut shutdown: watch::Receiver<bool>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "?".into());
    let (read_half, mut write_half) = stream.into_split();
    let mut inbound = FramedRead::new(read_half, EnvelopeCodec::new());
    let (queue_tx, mut queue) = mpsc::unbounded_channel::<Bytes>();

    room.join(id, queue_tx);
    info!(session = id, %peer, "session connected");

    loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(Inbound::Body(body))) => {
                    debug!(session = id, bytes = body.len(), "received message");
                    room.deliver(body);
                }
                Some(Ok(Inbound::Chatter(text))) => {
                    info!(session = id, "client says: {}", text.trim_end());
                }
                Some(Err(e)) => {
                    warn!(session = id, "read failed: {e}");
                    break;
                }
                None => {
                    debug!(session = id, "peer closed connection");
                    break;
                }
            },
            outbound = queue.recv() => match outbound {
                // one write in flight; the next waits in the queue
                Some(msg) => {
                    if let Err(e) = write_half.write_all(&msg).await {
                        warn!(session = id, "write failed: {e}");
                        break;
                    }
                }
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }

    room.leave(id);
    info!(session = id, %peer, "session closed");
}
