/*
src/wire.rs

The on-the-wire shapes of the protocol: the fixed-width buffers the tracker
and peers exchange, and the values carried inside them. A message never
carries more than one of these at a time -- a keyword, a hash, a length-
prefixed name, or a plain integer -- mirroring the one-send-per-field style
of the MPI program this protocol was lifted from.
*/

use std::fmt;

/// Keyword channel width, in bytes.
pub const MESSAGE_SIZE: usize = 10;
/// Fixed-width file-name channel, in bytes (13 usable chars + NUL + 1 slack byte).
pub const MAX_FILENAME: usize = 15;
/// Segment hash width, in bytes.
pub const HASH_SIZE: usize = 32;
/// Longest file name a peer may report, leaving room for the NUL terminator.
pub const MAX_FILENAME_CHARS: usize = MAX_FILENAME - 1;

/// A fixed-width, bytewise-equal segment hash. No structure is imposed on it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; HASH_SIZE]);

impl Hash {
    pub fn from_bytes(bytes: &[u8]) -> Result<Hash, String> {
        if bytes.len() != HASH_SIZE {
            return Err(format!(
                "hash must be exactly {HASH_SIZE} bytes, got {}",
                bytes.len()
            ));
        }
        let mut buf = [0u8; HASH_SIZE];
        buf.copy_from_slice(bytes);
        Ok(Hash(buf))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..")
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The control keywords exchanged on the keyword channel (tag 1/5/6 in spec
/// terms). Wire width is always `MESSAGE_SIZE`, NUL-padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Ack,
    Nack,
    Download,
    Swarm,
    OneFile,
    AllFiles,
    Shutdown,
}

impl Keyword {
    fn as_str(self) -> &'static str {
        match self {
            Keyword::Ack => "ACK",
            Keyword::Nack => "NACK",
            Keyword::Download => "DOWNLOAD",
            Keyword::Swarm => "SWARM",
            Keyword::OneFile => "ONE_FILE",
            Keyword::AllFiles => "ALL_FILES",
            Keyword::Shutdown => "SHUTDOWN",
        }
    }

    /// Encodes to the fixed `MESSAGE_SIZE` wire buffer, NUL-padded.
    ///
    /// The source program sent `SHUTDOWN` with a byte count of 9 rather than
    /// the declared `MESSAGE_SIZE` of 10; this implementation normalizes to
    /// `MESSAGE_SIZE` on every keyword, both directions.
    pub fn encode(self) -> [u8; MESSAGE_SIZE] {
        let mut buf = [0u8; MESSAGE_SIZE];
        let bytes = self.as_str().as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        buf
    }

    pub fn decode(buf: &[u8; MESSAGE_SIZE]) -> Result<Keyword, String> {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        match std::str::from_utf8(&buf[..end]) {
            Ok("ACK") => Ok(Keyword::Ack),
            Ok("NACK") => Ok(Keyword::Nack),
            Ok("DOWNLOAD") => Ok(Keyword::Download),
            Ok("SWARM") => Ok(Keyword::Swarm),
            Ok("ONE_FILE") => Ok(Keyword::OneFile),
            Ok("ALL_FILES") => Ok(Keyword::AllFiles),
            Ok("SHUTDOWN") => Ok(Keyword::Shutdown),
            Ok(other) => Err(format!("unknown keyword {other:?}")),
            Err(_) => Err("keyword buffer is not valid utf8".to_string()),
        }
    }
}

/// Encodes a file name into the fixed `MAX_FILENAME` channel used for
/// registration (tag 1) and swarm follow-ups (tag 7).
pub fn encode_fixed_name(name: &str) -> Result<[u8; MAX_FILENAME], String> {
    if name.len() > MAX_FILENAME_CHARS {
        return Err(format!(
            "file name {name:?} exceeds {MAX_FILENAME_CHARS} characters"
        ));
    }
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(format!("file name {name:?} must be non-empty and whitespace-free"));
    }
    let mut buf = [0u8; MAX_FILENAME];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    Ok(buf)
}

pub fn decode_fixed_name(buf: &[u8; MAX_FILENAME]) -> Result<String, String> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end])
        .map(str::to_string)
        .map_err(|_| "file name buffer is not valid utf8".to_string())
}

/// Encodes a file name into the variable-length, null-terminated buffer the
/// tracker uses in the broadcast phase (tag 0): the length sent ahead of it
/// includes the terminator, matching the source's `fileName.size() + 1`.
pub fn encode_broadcast_name(name: &str) -> Vec<u8> {
    let mut buf = name.as_bytes().to_vec();
    buf.push(0);
    buf
}

pub fn decode_broadcast_name(buf: &[u8]) -> Result<String, String> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end])
        .map(str::to_string)
        .map_err(|_| "file name buffer is not valid utf8".to_string())
}

/// The payload carried by a single message. A message is never a mix of
/// these -- each field in the protocol is its own send, the way the source
/// issues one `MPI_Send` per field.
#[derive(Debug, Clone)]
pub enum Payload {
    Keyword(Keyword),
    Hash(Hash),
    Int(i64),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn into_keyword(self) -> Result<Keyword, String> {
        match self {
            Payload::Keyword(k) => Ok(k),
            other => Err(format!("expected keyword payload, got {other:?}")),
        }
    }

    pub fn into_hash(self) -> Result<Hash, String> {
        match self {
            Payload::Hash(h) => Ok(h),
            other => Err(format!("expected hash payload, got {other:?}")),
        }
    }

    pub fn into_int(self) -> Result<i64, String> {
        match self {
            Payload::Int(i) => Ok(i),
            other => Err(format!("expected int payload, got {other:?}")),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, String> {
        match self {
            Payload::Bytes(b) => Ok(b),
            other => Err(format!("expected bytes payload, got {other:?}")),
        }
    }
}
