/*
src/peer/mod.rs

The peer supervisor: performs the registration handshake, then runs the
downloader and uploader concurrently, joining the downloader first (it
terminates on its own once every wanted file is processed) and the
uploader second (it terminates only once the tracker's SHUTDOWN arrives
after every peer reports ALL_FILES).
*/

pub mod bootstrap;
pub mod downloader;
pub mod uploader;

use std::path::Path;

use crate::error::SwarmError;
use crate::model::PeerInput;
use crate::net::Transport;

pub fn run(transport: &dyn Transport, session_dir: &Path, input: PeerInput) -> Result<(), SwarmError> {
    let rank = transport.rank();
    bootstrap::register(transport, &input.owned)?;
    log::info!("peer {rank}: registered with tracker");

    let mut tracker_view = bootstrap::receive_broadcast(transport)?;
    log::info!("peer {rank}: received broadcast, {} file(s) known", tracker_view.files.len());

    std::thread::scope(|scope| -> Result<(), SwarmError> {
        let downloader = scope.spawn(|| {
            downloader::run(transport, session_dir, &input.wanted, &input.owned, &mut tracker_view)
        });
        let uploader = scope.spawn(|| uploader::run(transport, &input.owned));

        downloader
            .join()
            .map_err(|_| SwarmError::Protocol(format!("peer {rank}: downloader thread panicked")))??;
        uploader
            .join()
            .map_err(|_| SwarmError::Protocol(format!("peer {rank}: uploader thread panicked")))??;

        Ok(())
    })
}
