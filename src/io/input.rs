/*
src/io/input.rs

Parses a peer's input file: the files it owns (name, segment count, then
that many hashes) followed by the files it wants. The source reads this
with whitespace-delimited `ifstream >>` extraction rather than strict
line boundaries, so this parser tokenizes on whitespace the same way
instead of assuming one field per line.
*/

use std::path::Path;

use crate::error::SwarmError;
use crate::model::{OwnedFiles, PeerInput};
use crate::wire::{Hash, HASH_SIZE, MAX_FILENAME_CHARS};

struct Tokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Tokens {
            iter: text.split_whitespace(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str, SwarmError> {
        self.iter
            .next()
            .ok_or_else(|| SwarmError::Configuration(format!("unexpected end of input reading {what}")))
    }

    fn next_usize(&mut self, what: &str) -> Result<usize, SwarmError> {
        let tok = self.next(what)?;
        tok.parse::<usize>()
            .map_err(|_| SwarmError::Configuration(format!("expected a number for {what}, got {tok:?}")))
    }
}

fn validate_file_name(name: &str) -> Result<(), SwarmError> {
    if name.is_empty() || name.len() > MAX_FILENAME_CHARS || name.chars().any(char::is_whitespace) {
        return Err(SwarmError::Configuration(format!(
            "file name {name:?} must be non-empty, whitespace-free, and at most {MAX_FILENAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn parse_hash(tok: &str) -> Result<Hash, SwarmError> {
    Hash::from_bytes(tok.as_bytes()).map_err(SwarmError::Configuration)
}

pub fn parse_peer_input(text: &str) -> Result<PeerInput, SwarmError> {
    let mut tokens = Tokens::new(text);

    let owned_count = tokens.next_usize("files_owned_count")?;
    let mut owned = OwnedFiles::default();
    for _ in 0..owned_count {
        let name = tokens.next("file name")?.to_string();
        validate_file_name(&name)?;
        let segment_count = tokens.next_usize("segment_count")?;

        let mut hashes = Vec::with_capacity(segment_count);
        for _ in 0..segment_count {
            let tok = tokens.next("segment hash")?;
            hashes.push(parse_hash(tok)?);
        }
        owned.files.insert(name, hashes);
    }

    let wanted_count = tokens.next_usize("files_wanted_count")?;
    let mut wanted = Vec::with_capacity(wanted_count);
    for _ in 0..wanted_count {
        let name = tokens.next("wanted file name")?.to_string();
        validate_file_name(&name)?;
        wanted.push(name);
    }

    for name in &wanted {
        if owned.files.contains_key(name) {
            return Err(SwarmError::Configuration(format!(
                "file {name:?} is listed as both owned and wanted"
            )));
        }
    }

    Ok(PeerInput { owned, wanted })
}

pub fn parse_peer_file(path: &Path) -> Result<PeerInput, SwarmError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        SwarmError::Configuration(format!("could not read input file {path:?}: {e}"))
    })?;
    parse_peer_input(&text)
}
