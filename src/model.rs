/*
src/model.rs

The data model shared by tracker and peer: file records, the tracker's
registry, and the per-peer view of it. `segment_count` is never stored
as a separate field -- it is `hashes.len()` everywhere, so the invariant
`len(hashes) == segment_count` holds by construction instead of by
discipline.
*/

use std::collections::HashMap;

use crate::net::Rank;
use crate::wire::Hash;

/// One file's record: its ordered hash sequence and the peers known to
/// hold at least one of its segments. Order of `hashes` is the file's
/// identity and is preserved end to end; order of `swarm` carries no
/// meaning.
#[derive(Debug, Clone, Default)]
pub struct FileRecord {
    pub hashes: Vec<Hash>,
    pub swarm: Vec<Rank>,
}

impl FileRecord {
    pub fn segment_count(&self) -> usize {
        self.hashes.len()
    }

    /// Appends `rank` to the swarm if it is not already present.
    pub fn add_to_swarm(&mut self, rank: Rank) {
        if !self.swarm.contains(&rank) {
            self.swarm.push(rank);
        }
    }

    /// Appends any hashes from `new_hashes` not already present, per the
    /// tracker's append-only registry rule.
    pub fn merge_hashes(&mut self, new_hashes: &[Hash]) {
        for hash in new_hashes {
            if !self.hashes.contains(hash) {
                self.hashes.push(*hash);
            }
        }
    }
}

/// The tracker's registry: every file mentioned by any peer's
/// registration, keyed by name. Monotonic for the life of the session --
/// file records are added on first mention and only grow.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub files: HashMap<String, FileRecord>,
}

impl Registry {
    pub fn record_ownership(&mut self, owner: Rank, file: &str, hashes: &[Hash]) {
        let record = self.files.entry(file.to_string()).or_default();
        record.merge_hashes(hashes);
        record.add_to_swarm(owner);
    }
}

/// A peer's knowledge of the global state, seeded by the tracker's
/// broadcast and refreshed (swarm membership only) during download.
#[derive(Debug, Clone, Default)]
pub struct TrackerView {
    pub files: HashMap<String, FileRecord>,
}

impl TrackerView {
    pub fn merge_swarm(&mut self, file: &str, members: &[Rank]) {
        let record = self.files.entry(file.to_string()).or_default();
        for &m in members {
            record.add_to_swarm(m);
        }
    }
}

/// The files a peer owns at session start, keyed by name. Immutable for
/// the life of the session -- see the design note on why the uploader
/// never sees segments acquired later (DESIGN.md).
#[derive(Debug, Clone, Default)]
pub struct OwnedFiles {
    pub files: HashMap<String, Vec<Hash>>,
}

impl OwnedFiles {
    /// Returns true if any owned file contains `hash`.
    pub fn has_segment(&self, hash: &Hash) -> bool {
        self.files.values().any(|hashes| hashes.contains(hash))
    }
}

/// A peer's parsed input file: what it owns and what it wants.
#[derive(Debug, Clone, Default)]
pub struct PeerInput {
    pub owned: OwnedFiles,
    pub wanted: Vec<String>,
}
