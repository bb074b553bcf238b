/*
src/peer/uploader.rs

Services incoming segment-availability probes until the tracker's
SHUTDOWN arrives. A single wildcard-source receive on the probe tag
multiplexes peer-originated DOWNLOAD against the tracker-originated
SHUTDOWN, exactly as the source's upload thread does.

The uploader answers from the peer's initial owned-file snapshot only
-- it never observes segments the sibling downloader acquires during
the session. See DESIGN.md for why this preserves the source's
behavior instead of extending it.
*/

use crate::error::SwarmError;
use crate::model::OwnedFiles;
use crate::net::{Transport, TAG_HASH_FOLLOWUP, TAG_PROBE, TAG_PROBE_RESPONSE};
use crate::wire::{Keyword, Payload};

pub fn run(transport: &dyn Transport, owned: &OwnedFiles) -> Result<(), SwarmError> {
    loop {
        let (source, payload) = transport.recv_any(TAG_PROBE)?;
        let keyword = payload.into_keyword().map_err(SwarmError::Protocol)?;

        match keyword {
            Keyword::Download => {
                let hash = transport.recv(source, TAG_HASH_FOLLOWUP)?.into_hash()?;
                let response = if owned.has_segment(&hash) {
                    Keyword::Ack
                } else {
                    Keyword::Nack
                };
                transport.send(source, TAG_PROBE_RESPONSE, Payload::Keyword(response))?;
                log::debug!("uploader: {source} asked for {hash}, replied {response:?}");
            }
            Keyword::Shutdown => {
                log::info!("uploader: received SHUTDOWN, exiting");
                return Ok(());
            }
            other => {
                return Err(SwarmError::Protocol(format!(
                    "unexpected keyword {other:?} on probe channel"
                )))
            }
        }
    }
}
