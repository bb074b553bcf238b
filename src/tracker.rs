/*
src/tracker.rs

The tracker: single-process swarm registry and termination coordinator.
Runs its three phases strictly in order -- registration, broadcast,
runtime -- and has no retries or timeouts anywhere; any transport error
here is fatal to the session.
*/

use crate::error::SwarmError;
use crate::model::Registry;
use crate::net::{Rank, Transport, TAG_BROADCAST, TAG_CONTROL, TAG_REGISTRATION, TAG_SWARM_FOLLOWUP};
use crate::wire::{decode_fixed_name, encode_broadcast_name, Keyword, Payload};

/// Summary of a completed tracker run, exposed for tests and for an
/// optional post-session report; `one_file_count` is tracked purely for
/// protocol compatibility and never gates any decision, per the source.
#[derive(Debug, Default)]
pub struct TrackerReport {
    pub registry: Registry,
    pub one_file_count: u32,
    pub all_files_count: u32,
}

pub fn run(transport: &dyn Transport, peer_count: u32) -> Result<TrackerReport, SwarmError> {
    let mut registry = Registry::default();

    registration_phase(transport, peer_count, &mut registry)?;
    broadcast_phase(transport, peer_count, &registry)?;
    let (one_file_count, all_files_count) = runtime_phase(transport, peer_count, &mut registry)?;

    Ok(TrackerReport {
        registry,
        one_file_count,
        all_files_count,
    })
}

fn registration_phase(
    transport: &dyn Transport,
    peer_count: u32,
    registry: &mut Registry,
) -> Result<(), SwarmError> {
    for rank in 1..peer_count {
        let peer = Rank(rank);
        let owned_count = transport.recv(peer, TAG_REGISTRATION)?.into_int()?;

        for _ in 0..owned_count {
            let name_buf: [u8; crate::wire::MAX_FILENAME] = transport
                .recv(peer, TAG_REGISTRATION)?
                .into_bytes()?
                .try_into()
                .map_err(|_| SwarmError::Protocol("malformed file name buffer".to_string()))?;
            let name = decode_fixed_name(&name_buf).map_err(SwarmError::Protocol)?;

            let segment_count = transport.recv(peer, TAG_REGISTRATION)?.into_int()?;
            let mut hashes = Vec::with_capacity(segment_count as usize);
            for _ in 0..segment_count {
                hashes.push(transport.recv(peer, TAG_REGISTRATION)?.into_hash()?);
            }

            registry.record_ownership(peer, &name, &hashes);
        }

        log::info!("tracker: registered peer {peer}");
    }

    for rank in 1..peer_count {
        transport.send(Rank(rank), TAG_REGISTRATION, Payload::Keyword(Keyword::Ack))?;
    }
    log::info!("tracker: registration complete, {} file(s) known", registry.files.len());

    Ok(())
}

fn broadcast_phase(
    transport: &dyn Transport,
    peer_count: u32,
    registry: &Registry,
) -> Result<(), SwarmError> {
    // Iteration order is stable across peers within a run but otherwise
    // unspecified, per spec; peers must not assume a particular order.
    let mut names: Vec<&String> = registry.files.keys().collect();
    names.sort();

    for rank in 1..peer_count {
        let peer = Rank(rank);
        transport.send(peer, TAG_BROADCAST, Payload::Int(names.len() as i64))?;

        for &name in &names {
            let record = &registry.files[name];
            let encoded_name = encode_broadcast_name(name);

            transport.send(peer, TAG_BROADCAST, Payload::Int(encoded_name.len() as i64))?;
            transport.send(peer, TAG_BROADCAST, Payload::Bytes(encoded_name))?;
            transport.send(peer, TAG_BROADCAST, Payload::Int(record.segment_count() as i64))?;
            for hash in &record.hashes {
                transport.send(peer, TAG_BROADCAST, Payload::Hash(*hash))?;
            }
            transport.send(peer, TAG_BROADCAST, Payload::Int(record.swarm.len() as i64))?;
            for member in &record.swarm {
                transport.send(peer, TAG_BROADCAST, Payload::Int(member.0 as i64))?;
            }
        }
    }
    log::info!("tracker: broadcast sent to {} peer(s)", peer_count - 1);

    Ok(())
}

fn runtime_phase(
    transport: &dyn Transport,
    peer_count: u32,
    registry: &mut Registry,
) -> Result<(u32, u32), SwarmError> {
    let mut one_file_count = 0u32;
    let mut all_files_count = 0u32;

    loop {
        let (source, payload) = transport.recv_any(TAG_CONTROL)?;
        let keyword = payload.into_keyword().map_err(SwarmError::Protocol)?;

        match keyword {
            Keyword::Swarm => handle_swarm_query(transport, source, registry)?,
            Keyword::OneFile => {
                one_file_count += 1;
                log::debug!("tracker: ONE_FILE from {source} ({one_file_count} total)");
            }
            Keyword::AllFiles => {
                all_files_count += 1;
                log::info!("tracker: ALL_FILES from {source} ({all_files_count}/{})", peer_count - 1);
                if all_files_count == peer_count - 1 {
                    for rank in 1..peer_count {
                        transport.send(Rank(rank), crate::net::TAG_PROBE, Payload::Keyword(Keyword::Shutdown))?;
                    }
                    log::info!("tracker: shutdown broadcast to all peers");
                    break;
                }
            }
            other => {
                return Err(SwarmError::Protocol(format!(
                    "unexpected keyword {other:?} on control channel"
                )))
            }
        }
    }

    Ok((one_file_count, all_files_count))
}

fn handle_swarm_query(
    transport: &dyn Transport,
    source: Rank,
    registry: &mut Registry,
) -> Result<(), SwarmError> {
    let name_buf: [u8; crate::wire::MAX_FILENAME] = transport
        .recv(source, TAG_SWARM_FOLLOWUP)?
        .into_bytes()?
        .try_into()
        .map_err(|_| SwarmError::Protocol("malformed file name buffer".to_string()))?;
    let name = decode_fixed_name(&name_buf).map_err(SwarmError::Protocol)?;

    let record = registry.files.entry(name.clone()).or_default();
    transport.send(source, TAG_SWARM_FOLLOWUP, Payload::Int(record.swarm.len() as i64))?;
    for member in record.swarm.clone() {
        transport.send(source, TAG_SWARM_FOLLOWUP, Payload::Int(member.0 as i64))?;
    }

    // A peer mid-download is a valid, soon-complete source for others;
    // advertising it early helps the swarm load-balance as it grows.
    record.add_to_swarm(source);
    log::debug!("tracker: swarm query for {name:?} from {source}, {} member(s)", record.swarm.len());

    Ok(())
}
