/*
src/peer/downloader.rs

Drives acquisition of every wanted file, file by file, segment by
segment, through repeated peer probes and periodic tracker swarm
refreshes. This is where the load-balancing selection policy and the
swarm-refresh cadence live.
*/

use std::collections::HashMap;
use std::path::Path;

use crate::error::SwarmError;
use crate::model::{OwnedFiles, TrackerView};
use crate::net::{Rank, Transport, TAG_CONTROL, TAG_HASH_FOLLOWUP, TAG_PROBE, TAG_PROBE_RESPONSE, TAG_SWARM_FOLLOWUP};
use crate::wire::{encode_fixed_name, Hash, Keyword, Payload};
use crate::io::output;

/// Refresh the file's swarm from the tracker every this-many successful
/// downloads within the file, plus always on the first attempt.
const SWARM_REFRESH_STRIDE: usize = 10;

pub fn run(
    transport: &dyn Transport,
    session_dir: &Path,
    wanted: &[String],
    owned: &OwnedFiles,
    tracker_view: &mut TrackerView,
) -> Result<(), SwarmError> {
    for file_name in wanted {
        let hashes = download_file(transport, file_name, owned, tracker_view)?;

        transport.send(Rank::TRACKER, TAG_CONTROL, Payload::Keyword(Keyword::OneFile))?;

        if let Err(err) = output::write_acquired_file(session_dir, transport.rank(), file_name, &hashes) {
            log::error!("downloader: {err}");
        }
    }

    transport.send(Rank::TRACKER, TAG_CONTROL, Payload::Keyword(Keyword::AllFiles))?;
    log::info!("downloader: all wanted files processed");

    Ok(())
}

fn download_file(
    transport: &dyn Transport,
    file_name: &str,
    owned: &OwnedFiles,
    tracker_view: &mut TrackerView,
) -> Result<Vec<Hash>, SwarmError> {
    let segment_count = tracker_view
        .files
        .get(file_name)
        .ok_or_else(|| SwarmError::Protocol(format!("{file_name:?} missing from tracker view")))?
        .segment_count();

    let mut hashes: Vec<Hash> = owned.files.get(file_name).cloned().unwrap_or_default();
    let mut usage_count: HashMap<Rank, u32> = HashMap::new();
    let mut downloaded_count = 0usize;

    for index in 0..segment_count {
        if downloaded_count % SWARM_REFRESH_STRIDE == 0 {
            refresh_swarm(transport, file_name, tracker_view)?;
        }

        let my_rank = transport.rank();
        let record = &tracker_view.files[file_name];
        let segment_hash = record.hashes[index];

        let mut candidates: Vec<Rank> = record
            .swarm
            .iter()
            .copied()
            .filter(|&r| r != my_rank)
            .collect();
        candidates.sort_by_key(|r| *usage_count.get(r).unwrap_or(&0));

        let mut acquired = false;
        for candidate in candidates {
            if probe(transport, candidate, &segment_hash)? {
                hashes.push(segment_hash);
                *usage_count.entry(candidate).or_insert(0) += 1;
                downloaded_count += 1;
                acquired = true;
                break;
            }
        }

        if !acquired {
            return Err(SwarmError::Protocol(format!(
                "no swarm member for {file_name:?} acked segment {index}, though the tracker's swarm guaranteed one"
            )));
        }
    }

    Ok(hashes)
}

/// Sends `SWARM` to the tracker for `file_name` and merges the returned
/// membership into the local tracker view. No duplicates.
fn refresh_swarm(
    transport: &dyn Transport,
    file_name: &str,
    tracker_view: &mut TrackerView,
) -> Result<(), SwarmError> {
    let encoded_name = encode_fixed_name(file_name).map_err(SwarmError::Protocol)?;

    transport.send(Rank::TRACKER, TAG_CONTROL, Payload::Keyword(Keyword::Swarm))?;
    transport.send(Rank::TRACKER, TAG_SWARM_FOLLOWUP, Payload::Bytes(encoded_name.to_vec()))?;

    let swarm_size = transport.recv(Rank::TRACKER, TAG_SWARM_FOLLOWUP)?.into_int()?;
    let mut members = Vec::with_capacity(swarm_size as usize);
    for _ in 0..swarm_size {
        let id = transport.recv(Rank::TRACKER, TAG_SWARM_FOLLOWUP)?.into_int()?;
        members.push(Rank(id as u32));
    }

    tracker_view.merge_swarm(file_name, &members);
    Ok(())
}

/// Probes `candidate` for `hash`: true on ACK, false on NACK.
fn probe(transport: &dyn Transport, candidate: Rank, hash: &Hash) -> Result<bool, SwarmError> {
    transport.send(candidate, TAG_PROBE, Payload::Keyword(Keyword::Download))?;
    transport.send(candidate, TAG_HASH_FOLLOWUP, Payload::Hash(*hash))?;

    match transport.recv(candidate, TAG_PROBE_RESPONSE)?.into_keyword().map_err(SwarmError::Protocol)? {
        Keyword::Ack => Ok(true),
        Keyword::Nack => Ok(false),
        other => Err(SwarmError::Protocol(format!(
            "unexpected keyword {other:?} as probe response from {candidate}"
        ))),
    }
}
