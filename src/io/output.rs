/*
src/io/output.rs

Writes an acquired file's hash list, one hash per line, in the order the
tracker's broadcast gave for that file. Failures here are tolerated: the
downloader logs and moves on to the next wanted file rather than aborting
the session (spec's "output error" kind).
*/

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::SwarmError;
use crate::net::Rank;
use crate::wire::Hash;

pub fn output_file_name(rank: Rank, file_name: &str) -> String {
    format!("client{}_{}", rank.0, file_name)
}

pub fn write_acquired_file(
    session_dir: &Path,
    rank: Rank,
    file_name: &str,
    hashes: &[Hash],
) -> Result<(), SwarmError> {
    let path = session_dir.join(output_file_name(rank, file_name));
    write_hash_list(&path, hashes).map_err(|source| SwarmError::Output { path, source })
}

fn write_hash_list(path: &PathBuf, hashes: &[Hash]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for hash in hashes {
        // Writes the raw 32-byte payload (the printable string a peer's
        // input file carries), not the hex `Display` form used for
        // logging -- this is what round-trips through `parse_hash`.
        writeln!(file, "{}", String::from_utf8_lossy(hash.as_bytes()))?;
    }
    Ok(())
}
