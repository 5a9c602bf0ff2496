use std::env;
use std::error::Error;
use std::path::Path;
use std::process;

use bitfetch::bencode;
use bitfetch::config::Config;
use bitfetch::engine::Downloader;
use bitfetch::file_io;
use bitfetch::peer::PeerSession;
use bitfetch::torrent::Torrent;
use bitfetch::utils;

const USAGE: &str = "usage:
  bitfetch decode <bencoded value>
  bitfetch info <torrent file>
  bitfetch peers <torrent file>
  bitfetch handshake <torrent file> <host:port>
  bitfetch download_piece -o <output file> <torrent file> <piece index>
  bitfetch download -o <output file> <torrent file>";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if let Err(err) = run(&args).await {
        eprintln!("{err}");
        process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<(), Box<dyn Error + Send + Sync>> {
    let command = args.get(1).map(String::as_str).unwrap_or_default();
    match command {
        "decode" => {
            let input = args.get(2).ok_or(USAGE)?;
            let value = bencode::decode_all(input.as_bytes())?;
            println!("{}", bencode::to_json(&value));
        }
        "info" => {
            let path = args.get(2).ok_or(USAGE)?;
            let torrent = Torrent::from_file(path)?;
            println!("Tracker URL: {}", torrent.announce);
            println!("Length: {}", torrent.info.length);
            println!("Info Hash: {}", hex::encode(torrent.info_hash));
            println!("Piece Length: {}", torrent.info.piece_length);
            println!("Piece Hashes:");
            for hash in &torrent.info.pieces {
                println!("{}", hex::encode(hash));
            }
        }
        "peers" => {
            let path = args.get(2).ok_or(USAGE)?;
            let torrent = Torrent::from_file(path)?;
            let downloader = Downloader::from_tracker(torrent, Config::load()).await?;
            for addr in downloader.peers() {
                println!("{addr}");
            }
        }
        "handshake" => {
            let (path, addr) = match (args.get(2), args.get(3)) {
                (Some(path), Some(addr)) => (path, addr),
                _ => return Err(USAGE.into()),
            };
            let config = Config::load();
            let torrent = Torrent::from_file(path)?;
            let peer_id = utils::generate_peer_id(&config.peer_id_prefix);
            let session = PeerSession::connect(
                addr,
                &torrent.info_hash,
                &peer_id,
                config.dial_timeout(),
                config.stall_timeout(),
            )
            .await?;
            println!("Peer ID: {}", hex::encode(session.remote_peer_id()));
        }
        "download_piece" => {
            if args.len() < 6 || args[2] != "-o" {
                return Err(USAGE.into());
            }
            let output = &args[3];
            let index: u32 = args[5].parse().map_err(|_| "piece index must be a number")?;

            let torrent = Torrent::from_file(&args[4])?;
            if index as usize >= torrent.info.piece_count() {
                return Err(format!(
                    "piece {index} out of range (torrent has {} pieces)",
                    torrent.info.piece_count()
                )
                .into());
            }
            let downloader = Downloader::from_tracker(torrent, Config::load()).await?;
            let bytes = downloader.download_piece(index).await?;
            file_io::write_file_atomic(Path::new(output), &bytes).await?;
            println!("Piece {index} downloaded to {output}.");
        }
        "download" => {
            if args.len() < 5 || args[2] != "-o" {
                return Err(USAGE.into());
            }
            let output = &args[3];
            let torrent = Torrent::from_file(&args[4])?;
            let downloader = Downloader::from_tracker(torrent, Config::load()).await?;
            let bytes = downloader.download_all().await?;
            file_io::write_file_atomic(Path::new(output), &bytes).await?;
            println!("Downloaded {} to {output}.", args[4]);
        }
        _ => return Err(USAGE.into()),
    }
    Ok(())
}
