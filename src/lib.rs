//! A centrally-tracked, peer-to-peer segment exchange protocol: one
//! tracker process and N-1 peer processes agree on file identity purely
//! through ordered lists of segment hashes, and acquire files from each
//! other through tracker-mediated swarm discovery and direct peer
//! probes. No segment payload is ever transferred -- the unit of
//! "download" is acknowledged ownership of a hash.

pub mod error;
pub mod io;
pub mod model;
pub mod net;
pub mod peer;
pub mod tracker;
pub mod wire;

pub use error::SwarmError;
pub use net::Rank;
