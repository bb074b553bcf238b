/*
src/net.rs

The transport abstraction: a reliable, in-order, typed point-to-point
channel with tag-based demultiplexing and a wildcard-source receive that
returns the sender's identity, per the transport contract this protocol
was designed against. The only backend implemented here wires every rank
up with in-process `crossbeam` channels, one per (source, destination,
tag) triple, which keeps the FIFO-per-triple guarantee the protocol
relies on without any shared lock.
*/

use std::collections::HashMap;
use std::fmt;

use crossbeam::channel::{unbounded, Receiver, Select, Sender};

use crate::wire::Payload;

/// A participant's identifier. The tracker is always rank 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(pub u32);

impl Rank {
    pub const TRACKER: Rank = Rank(0);
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A demultiplexing tag. Tag numbers are reused across unrelated
/// (source, destination) pairs by design -- see spec's tag table -- so
/// this crate keys channels on the full `(source, destination, tag)`
/// triple rather than tag alone.
pub type Tag = u8;

pub const TAG_REGISTRATION: Tag = 1;
pub const TAG_BROADCAST: Tag = 0;
pub const TAG_PROBE: Tag = 5; // peer <-> peer DOWNLOAD probe; also tracker -> peer SHUTDOWN
pub const TAG_PROBE_RESPONSE: Tag = 1; // peer -> peer ACK/NACK
pub const TAG_HASH_FOLLOWUP: Tag = 0; // peer -> peer hash following a DOWNLOAD probe
pub const TAG_CONTROL: Tag = 6; // peer -> tracker SWARM / ONE_FILE / ALL_FILES
pub const TAG_SWARM_FOLLOWUP: Tag = 7; // peer <-> tracker SWARM follow-up

/// A transport error: the session cannot continue. There are no retries
/// or timeouts anywhere in this protocol, so any transport failure is
/// fatal to the run, per spec's failure semantics.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("no channel registered for {0:?} -> {1:?} on tag {2}")]
    UnknownRoute(Rank, Rank, Tag),
    #[error("peer {0:?} disconnected before sending on tag {2} to {1:?}")]
    Disconnected(Rank, Rank, Tag),
}

/// Any type implementing this can stand in for the channel-based backend;
/// swapping `Transport` impls never touches tracker/peer logic. `Sync` is
/// required so a `&dyn Transport` captured by two scoped-thread closures
/// (the peer supervisor's downloader/uploader pair) is itself `Send`.
pub trait Transport: Send + Sync {
    fn rank(&self) -> Rank;
    fn send(&self, dest: Rank, tag: Tag, payload: Payload) -> Result<(), TransportError>;
    /// Blocks until a message arrives from `source` on `tag`.
    fn recv(&self, source: Rank, tag: Tag) -> Result<Payload, TransportError>;
    /// Blocks until a message arrives from any source on `tag`, returning
    /// the payload together with the sender's rank.
    fn recv_any(&self, tag: Tag) -> Result<(Rank, Payload), TransportError>;
}

struct Envelope {
    payload: Payload,
}

/// Builds the full mesh of channels for a session of `size` ranks (rank 0
/// is the tracker, 1..size are peers) and hands back one handle per rank.
pub struct Network;

impl Network {
    pub fn build(size: u32) -> Vec<NetworkHandle> {
        let tags = [
            TAG_REGISTRATION,
            TAG_BROADCAST,
            TAG_PROBE,
            TAG_PROBE_RESPONSE,
            TAG_HASH_FOLLOWUP,
            TAG_CONTROL,
            TAG_SWARM_FOLLOWUP,
        ];

        // senders[(src, dst, tag)] -> Sender, owned by rank `src`'s handle
        let mut senders: HashMap<(Rank, Rank, Tag), Sender<Envelope>> = HashMap::new();
        // receivers[(dst, tag)] -> Vec<(src, Receiver)>, owned by rank `dst`'s handle
        let mut receivers: HashMap<(Rank, Tag), Vec<(Rank, Receiver<Envelope>)>> = HashMap::new();

        for src in 0..size {
            for dst in 0..size {
                if src == dst {
                    continue;
                }
                for &tag in &tags {
                    let (tx, rx) = unbounded();
                    senders.insert((Rank(src), Rank(dst), tag), tx);
                    receivers
                        .entry((Rank(dst), tag))
                        .or_default()
                        .push((Rank(src), rx));
                }
            }
        }

        (0..size)
            .map(|r| {
                let rank = Rank(r);
                let my_senders = senders
                    .iter()
                    .filter(|((src, _, _), _)| *src == rank)
                    .map(|(k, v)| (*k, v.clone()))
                    .collect();
                let my_receivers = receivers
                    .iter()
                    .filter(|((dst, _), _)| *dst == rank)
                    .map(|(k, v)| {
                        (
                            *k,
                            v.iter().map(|(s, r)| (*s, r.clone())).collect::<Vec<_>>(),
                        )
                    })
                    .collect();
                NetworkHandle {
                    rank,
                    senders: my_senders,
                    receivers: my_receivers,
                }
            })
            .collect()
    }
}

/// A rank's view of the mesh: the senders it may use and the receivers it
/// may read from. Cloning the underlying `crossbeam` channel endpoints is
/// cheap, so each handle owns exactly the endpoints relevant to its rank.
pub struct NetworkHandle {
    rank: Rank,
    senders: HashMap<(Rank, Rank, Tag), Sender<Envelope>>,
    receivers: HashMap<(Rank, Tag), Vec<(Rank, Receiver<Envelope>)>>,
}

impl Transport for NetworkHandle {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn send(&self, dest: Rank, tag: Tag, payload: Payload) -> Result<(), TransportError> {
        let key = (self.rank, dest, tag);
        let sender = self
            .senders
            .get(&key)
            .ok_or(TransportError::UnknownRoute(self.rank, dest, tag))?;
        log::debug!("{:?} -> {:?} [tag {}] {:?}", self.rank, dest, tag, payload);
        sender
            .send(Envelope { payload })
            .map_err(|_| TransportError::Disconnected(self.rank, dest, tag))
    }

    fn recv(&self, source: Rank, tag: Tag) -> Result<Payload, TransportError> {
        let candidates = self
            .receivers
            .get(&(self.rank, tag))
            .ok_or(TransportError::UnknownRoute(source, self.rank, tag))?;
        let (_, rx) = candidates
            .iter()
            .find(|(r, _)| *r == source)
            .ok_or(TransportError::UnknownRoute(source, self.rank, tag))?;
        let envelope = rx
            .recv()
            .map_err(|_| TransportError::Disconnected(source, self.rank, tag))?;
        log::debug!(
            "{:?} <- {:?} [tag {}] {:?}",
            self.rank,
            source,
            tag,
            envelope.payload
        );
        Ok(envelope.payload)
    }

    fn recv_any(&self, tag: Tag) -> Result<(Rank, Payload), TransportError> {
        let candidates = self
            .receivers
            .get(&(self.rank, tag))
            .ok_or(TransportError::UnknownRoute(Rank(u32::MAX), self.rank, tag))?;
        if candidates.is_empty() {
            return Err(TransportError::UnknownRoute(Rank(u32::MAX), self.rank, tag));
        }

        let mut select = Select::new();
        for (_, rx) in candidates {
            select.recv(rx);
        }
        loop {
            let op = select.select();
            let index = op.index();
            let (source, rx) = &candidates[index];
            match op.recv(rx) {
                Ok(envelope) => {
                    log::debug!(
                        "{:?} <- {:?} [tag {}] {:?} (wildcard)",
                        self.rank,
                        source,
                        tag,
                        envelope.payload
                    );
                    return Ok((*source, envelope.payload));
                }
                Err(_) => continue,
            }
        }
    }
}
