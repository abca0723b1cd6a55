//! Queue bridge: moves encoded messages from producer threads into the
//! reactor.
//!
//! Producers push onto a crossbeam queue and never touch sockets. A dedicated
//! thread blocks on that queue and forwards each payload to the internal
//! client task through an unbounded tokio channel. The [`SENTINEL`] message
//! ends the thread.

use std::thread::JoinHandle;

use bytes::Bytes;
use crossbeam_channel::Receiver;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use rtcm_core::hex_decode;

/// Queue message that stops the bridge.
pub const SENTINEL: &str = "Goodbye";

/// Wire payload of a queued message. Hex text (the `print_*` output) is sent
/// as the binary frame it encodes; anything else is relayed verbatim.
pub fn payload(text: &str) -> Bytes {
    match hex_decode(text.trim()) {
        Some(bytes) if !bytes.is_empty() => Bytes::from(bytes),
        _ => Bytes::copy_from_slice(text.as_bytes()),
    }
}

/// Spawn the thread draining `queue` into `client`.
pub fn spawn_bridge(queue: Receiver<String>, client: UnboundedSender<Bytes>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("rtcm-bridge".into())
        .spawn(move || {
            let mut forwarded = 0u64;
            while let Ok(text) = queue.recv() {
                if text == SENTINEL {
                    break;
                }
                if client.send(payload(&text)).is_err() {
                    debug!("internal client gone, stopping bridge");
                    break;
                }
                forwarded += 1;
            }
            info!(forwarded, "queue bridge stopped");
        })
}
