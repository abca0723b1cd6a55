//! rtcm-feeder: read RTCM 3 streams, verify frames and print what they carry.
//!
//! Supports:
//! - Binary capture files (raw receiver or caster output)
//! - Hex frame files, one frame per line
//! - Live TCP streams, e.g. an `rtcm serve` instance or a receiver port

use std::net::TcpStream;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rtcm_core::{decode, describe, RtcmMessage};

mod capture;

#[derive(Parser)]
#[command(name = "rtcm-feeder", version, about = "RTCM 3 stream capture and decoding")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Frame and decode a capture file
    Read {
        /// Path to a binary capture (or a hex file with --hex)
        file: PathBuf,

        /// Input holds hex frames, one per line
        #[arg(long)]
        hex: bool,
    },

    /// Connect to a TCP source and print frames as they arrive
    Connect {
        /// Address of the source (host:port)
        addr: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Read { file, hex } => cmd_read(file, hex),
        Commands::Connect { addr } => cmd_connect(&addr),
    }
}

fn print_frame(msg: &RtcmMessage) {
    let msg_type = msg.message_type().unwrap_or(0);
    println!(
        "{msg_type:4} {:5} bytes  {}",
        msg.len(),
        describe(msg_type).unwrap_or("unknown")
    );
    if let Some(decoded) = decode(msg) {
        println!("  {decoded:?}");
    }
}

fn cmd_read(file: PathBuf, hex: bool) {
    let path_str = file.display().to_string();
    eprintln!("Reading: {path_str}");

    if hex {
        let reader = capture::FrameReader::new(&path_str);
        let (frames, rejected) = reader.read_all().unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });
        for msg in &frames {
            print_frame(msg);
        }
        eprintln!("{} frames, {rejected} rejected", frames.len());
        return;
    }

    let (frames, stats) = capture::read_binary(&path_str).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    for msg in &frames {
        print_frame(msg);
    }
    eprintln!(
        "{} bytes: {} frames, {} bytes skipped, {} CRC failures",
        stats.bytes, stats.frames, stats.discarded, stats.crc_failures
    );
}

fn cmd_connect(addr: &str) {
    let stream = TcpStream::connect(addr).unwrap_or_else(|e| {
        eprintln!("Error connecting to {addr}: {e}");
        std::process::exit(1);
    });
    eprintln!("Connected to {addr}");

    match capture::pump(stream, |msg| print_frame(&msg)) {
        Ok(stats) => eprintln!(
            "Connection closed: {} frames, {} bytes skipped, {} CRC failures",
            stats.frames, stats.discarded, stats.crc_failures
        ),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
