//! Broadcast room: the set of live sessions plus a replay ring.
//!
//! The room is owned by a single task and changed only through
//! [`RoomEvent`]s, so membership and the ring need no locks. Sessions hold a
//! [`RoomHandle`], a sender into that task.

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Messages kept for late joiners.
pub const REPLAY_DEPTH: usize = 1;

pub type SessionId = u64;

#[derive(Debug, Default)]
pub struct Room {
    sessions: HashMap<SessionId, mpsc::UnboundedSender<Bytes>>,
    recent: VecDeque<Bytes>,
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session and replay the most recent message to it.
    pub fn join(&mut self, id: SessionId, queue: mpsc::UnboundedSender<Bytes>) {
        for msg in &self.recent {
            let _ = queue.send(msg.clone());
        }
        self.sessions.insert(id, queue);
        info!(session = id, members = self.sessions.len(), "session joined");
    }

    pub fn leave(&mut self, id: SessionId) {
        if self.sessions.remove(&id).is_some() {
            info!(session = id, members = self.sessions.len(), "session left");
        }
    }

    /// Queue `msg` on every session and remember it for the next joiner.
    pub fn deliver(&mut self, msg: Bytes) {
        self.recent.push_back(msg.clone());
        while self.recent.len() > REPLAY_DEPTH {
            self.recent.pop_front();
        }
        // a closed queue means the session is already on its way out
        self.sessions.retain(|_, queue| queue.send(msg.clone()).is_ok());
        debug!(bytes = msg.len(), members = self.sessions.len(), "delivered");
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn recent(&self) -> impl Iterator<Item = &Bytes> {
        self.recent.iter()
    }
}

#[derive(Debug)]
pub enum RoomEvent {
    Join {
        id: SessionId,
        queue: mpsc::UnboundedSender<Bytes>,
    },
    Leave(SessionId),
    Deliver(Bytes),
}

/// Cloneable sender into the room task.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    tx: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    pub fn join(&self, id: SessionId, queue: mpsc::UnboundedSender<Bytes>) {
        let _ = self.tx.send(RoomEvent::Join { id, queue });
    }

    pub fn leave(&self, id: SessionId) {
        let _ = self.tx.send(RoomEvent::Leave(id));
    }

    pub fn deliver(&self, msg: Bytes) {
        let _ = self.tx.send(RoomEvent::Deliver(msg));
    }
}

/// Spawn the room task on the current runtime.
pub fn spawn_room() -> RoomHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut room = Room::new();
        while let Some(event) = rx.recv().await {
            match event {
                RoomEvent::Join { id, queue } => room.join(id, queue),
                RoomEvent::Leave(id) => room.leave(id),
                RoomEvent::Deliver(msg) => room.deliver(msg),
            }
        }
    });
    RoomHandle { tx }
}
