/*
src/peer/bootstrap.rs

Registration and broadcast reception: a peer reports what it owns, waits
for the tracker's ACK, then receives the full registry before anything
else runs. A downloader that started before the broadcast landed would
have no tracker view to consult, so the peer supervisor must not launch
either worker thread until this function returns.
*/

use crate::error::SwarmError;
use crate::model::{OwnedFiles, TrackerView};
use crate::net::{Rank, Transport, TAG_BROADCAST, TAG_REGISTRATION};
use crate::wire::{decode_broadcast_name, encode_fixed_name, Keyword, Payload};

pub fn register(transport: &dyn Transport, owned: &OwnedFiles) -> Result<(), SwarmError> {
    transport.send(Rank::TRACKER, TAG_REGISTRATION, Payload::Int(owned.files.len() as i64))?;

    for (name, hashes) in &owned.files {
        let encoded_name = encode_fixed_name(name).map_err(SwarmError::Protocol)?;
        transport.send(Rank::TRACKER, TAG_REGISTRATION, Payload::Bytes(encoded_name.to_vec()))?;
        transport.send(Rank::TRACKER, TAG_REGISTRATION, Payload::Int(hashes.len() as i64))?;
        for hash in hashes {
            transport.send(Rank::TRACKER, TAG_REGISTRATION, Payload::Hash(*hash))?;
        }
    }

    match transport.recv(Rank::TRACKER, TAG_REGISTRATION)?.into_keyword().map_err(SwarmError::Protocol)? {
        Keyword::Ack => Ok(()),
        other => Err(SwarmError::Protocol(format!(
            "expected ACK from tracker after registration, got {other:?}"
        ))),
    }
}

pub fn receive_broadcast(transport: &dyn Transport) -> Result<TrackerView, SwarmError> {
    let total_files = transport.recv(Rank::TRACKER, TAG_BROADCAST)?.into_int()?;
    let mut view = TrackerView::default();

    for _ in 0..total_files {
        let name_len = transport.recv(Rank::TRACKER, TAG_BROADCAST)?.into_int()?;
        let name_bytes = transport.recv(Rank::TRACKER, TAG_BROADCAST)?.into_bytes()?;
        if name_bytes.len() as i64 != name_len {
            return Err(SwarmError::Protocol(
                "broadcast file name length did not match the declared length".to_string(),
            ));
        }
        let name = decode_broadcast_name(&name_bytes).map_err(SwarmError::Protocol)?;

        let segment_count = transport.recv(Rank::TRACKER, TAG_BROADCAST)?.into_int()?;
        let mut hashes = Vec::with_capacity(segment_count as usize);
        for _ in 0..segment_count {
            hashes.push(transport.recv(Rank::TRACKER, TAG_BROADCAST)?.into_hash()?);
        }

        let swarm_size = transport.recv(Rank::TRACKER, TAG_BROADCAST)?.into_int()?;
        let mut swarm = Vec::with_capacity(swarm_size as usize);
        for _ in 0..swarm_size {
            let id = transport.recv(Rank::TRACKER, TAG_BROADCAST)?.into_int()?;
            swarm.push(Rank(id as u32));
        }

        let record = view.files.entry(name).or_default();
        record.hashes = hashes;
        record.swarm = swarm;
    }

    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Network;
    use crate::wire::Hash;
    use std::collections::HashMap;

    #[test]
    fn register_then_ack_round_trips_ownership() {
        let handles = Network::build(2);
        let tracker = &handles[0];
        let peer = &handles[1];

        let mut files = HashMap::new();
        files.insert("F".to_string(), vec![Hash([1; 32]), Hash([2; 32])]);
        let owned = OwnedFiles { files };

        std::thread::scope(|s| {
            let registrant = s.spawn(|| register(peer, &owned));

            let count = tracker.recv(Rank(1), TAG_REGISTRATION).unwrap().into_int().unwrap();
            assert_eq!(count, 1);
            let _name = tracker.recv(Rank(1), TAG_REGISTRATION).unwrap().into_bytes().unwrap();
            let segment_count = tracker.recv(Rank(1), TAG_REGISTRATION).unwrap().into_int().unwrap();
            assert_eq!(segment_count, 2);
            for _ in 0..segment_count {
                tracker.recv(Rank(1), TAG_REGISTRATION).unwrap().into_hash().unwrap();
            }
            tracker.send(Rank(1), TAG_REGISTRATION, Payload::Keyword(Keyword::Ack)).unwrap();

            registrant.join().unwrap().unwrap();
        });
    }

    #[test]
    fn broadcast_round_trip_preserves_file_records() {
        let handles = Network::build(2);
        let tracker = &handles[0];
        let peer = &handles[1];

        std::thread::scope(|s| {
            let receiver = s.spawn(|| receive_broadcast(peer));

            tracker.send(Rank(1), TAG_BROADCAST, Payload::Int(1)).unwrap();
            let encoded = crate::wire::encode_broadcast_name("F");
            tracker.send(Rank(1), TAG_BROADCAST, Payload::Int(encoded.len() as i64)).unwrap();
            tracker.send(Rank(1), TAG_BROADCAST, Payload::Bytes(encoded)).unwrap();
            tracker.send(Rank(1), TAG_BROADCAST, Payload::Int(2)).unwrap();
            tracker.send(Rank(1), TAG_BROADCAST, Payload::Hash(Hash([1; 32]))).unwrap();
            tracker.send(Rank(1), TAG_BROADCAST, Payload::Hash(Hash([2; 32]))).unwrap();
            tracker.send(Rank(1), TAG_BROADCAST, Payload::Int(1)).unwrap();
            tracker.send(Rank(1), TAG_BROADCAST, Payload::Int(3)).unwrap();

            let view = receiver.join().unwrap().unwrap();
            let record = view.files.get("F").unwrap();
            assert_eq!(record.hashes, vec![Hash([1; 32]), Hash([2; 32])]);
            assert_eq!(record.swarm, vec![Rank(3)]);
        });
    }
}
