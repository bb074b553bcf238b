/*
src/main.rs

Launches a session of N processes -- rank 0 as the tracker, ranks
1..N as peers -- as one thread group in a single process, wired
together by the in-process channel transport. Real process
bootstrapping and the choice of transport are external concerns this
binary happens to supply a default for; swapping either never touches
swarmd's protocol logic.
*/

use std::path::PathBuf;

use clap::Parser;
use swarmd::io::input::parse_peer_file;
use swarmd::net::Network;
use swarmd::{peer, tracker};

/// Runs a swarmd session: one tracker and N-1 peers exchanging segment
/// ownership over a simulated point-to-point transport.
#[derive(Parser, Debug)]
struct Cli {
    /// Directory holding in<rank>.txt for every peer; client<rank>_<file>
    /// outputs are written here too.
    #[clap(short, long)]
    session_dir: PathBuf,

    /// Total process count, including the tracker (so 3 means 1 tracker
    /// and 2 peers).
    #[clap(short, long)]
    peers: u32,
}

fn main() {
    env_logger::init();
    let args = Cli::parse();

    if args.peers < 2 {
        eprintln!("--peers must be at least 2 (one tracker, at least one peer)");
        std::process::exit(1);
    }

    if let Err(err) = run(&args) {
        eprintln!("swarmd: {err:?}");
        std::process::exit(1);
    }
}

fn run(args: &Cli) -> anyhow::Result<()> {
    let handles = Network::build(args.peers);

    let mut peer_inputs = Vec::with_capacity((args.peers - 1) as usize);
    for rank in 1..args.peers {
        let path = args.session_dir.join(format!("in{rank}.txt"));
        peer_inputs.push(parse_peer_file(&path)?);
    }

    std::thread::scope(|scope| {
        let tracker_handle = &handles[0];
        let peer_count = args.peers;
        let tracker_thread = scope.spawn(move || tracker::run(tracker_handle, peer_count));

        let session_dir = args.session_dir.as_path();
        let peer_threads: Vec<_> = peer_inputs
            .into_iter()
            .zip(handles[1..].iter())
            .map(|(input, handle)| scope.spawn(move || peer::run(handle, session_dir, input)))
            .collect();

        let report = tracker_thread
            .join()
            .map_err(|_| anyhow::anyhow!("tracker thread panicked"))??;
        log::info!(
            "tracker: session complete, {} file(s), {} ONE_FILE, {} ALL_FILES",
            report.registry.files.len(),
            report.one_file_count,
            report.all_files_count
        );

        for (i, thread) in peer_threads.into_iter().enumerate() {
            thread
                .join()
                .map_err(|_| anyhow::anyhow!("peer {} thread panicked", i + 1))??;
        }

        Ok(())
    })
}
