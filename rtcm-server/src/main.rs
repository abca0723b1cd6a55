//! rtcm: CLI for the RTCM fan-out server and message inspection.

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing_subscriber::EnvFilter;

use rtcm_core::config::{self, Config};
use rtcm_core::{describe, parse_hex, Rtcm, RtcmMessage};
use rtcm_server::RtcmServer;

#[derive(Parser)]
#[command(name = "rtcm", version, about = "RTCM 3 encoder, decoder and fan-out server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve hex messages read from stdin (one per line) to TCP clients
    Serve {
        /// Listen address (default from config)
        #[arg(long, env = "RTCM_HOST")]
        host: Option<String>,

        /// Listen port (default from config)
        #[arg(long, env = "RTCM_PORT")]
        port: Option<u16>,
    },

    /// Decode hex messages from a file and print a summary table
    Decode {
        /// Path to file containing hex messages (one per line), or - for stdin
        file: PathBuf,

        /// Print every decoded message as JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Print the MT1005 for the reference station
    Station {
        #[arg(long)]
        id: Option<u16>,
        #[arg(long, allow_negative_numbers = true)]
        x: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        y: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        z: Option<f64>,

        /// Store the resulting station in the config file
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config();

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(&cfg, host, port),
        Commands::Decode { file, json } => cmd_decode(file, json),
        Commands::Station { id, x, y, z, save } => cmd_station(cfg, id, x, y, z, save),
    }
}

fn open_input(file: &PathBuf) -> Box<dyn BufRead> {
    if file.to_str() == Some("-") {
        Box::new(io::stdin().lock())
    } else {
        let f = std::fs::File::open(file).unwrap_or_else(|e| {
            eprintln!("Error opening {}: {e}", file.display());
            std::process::exit(1);
        });
        Box::new(io::BufReader::new(f))
    }
}

fn cmd_serve(cfg: &Config, host: Option<String>, port: Option<u16>) {
    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| cfg.server.host.clone()),
        port.unwrap_or(cfg.server.port)
    );

    let mut server = RtcmServer::new(addr);
    let local = server.run_server().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    eprintln!("RTCM server listening on {local}, reading messages from stdin");

    let mut sent = 0u64;
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        if let Err(e) = server.send_message(text) {
            eprintln!("Error: {e}");
            break;
        }
        sent += 1;
    }

    if let Err(e) = server.stop_server() {
        eprintln!("Error: {e}");
    }
    eprintln!("Stopped after {sent} messages");
}

fn cmd_decode(file: PathBuf, json: bool) {
    let reader = open_input(&file);

    let mut messages: Vec<RtcmMessage> = Vec::new();
    let mut rejected = 0u64;

    for line in reader.lines() {
        let Ok(line) = line else { continue };
        let hex = line.trim();
        if hex.is_empty() || hex.starts_with('#') {
            continue;
        }
        match parse_hex(hex) {
            Ok(msg) => messages.push(msg),
            Err(e) => {
                rejected += 1;
                tracing::debug!("rejected line: {e}");
            }
        }
    }

    if json {
        for msg in &messages {
            let value = match rtcm_core::decode(msg) {
                Some(decoded) => serde_json::to_value(decoded),
                None => Ok(serde_json::json!({
                    "kind": "Undecoded",
                    "message_type": msg.message_type(),
                    "hex": msg.to_hex(),
                })),
            };
            match value {
                Ok(v) => println!("{v}"),
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        return;
    }

    println!();
    println!("Messages: {} valid, {rejected} rejected", messages.len());
    println!();
    if messages.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Type", "Bytes", "CRC", "Description", "Summary"]);
    for msg in &messages {
        let msg_type = msg.message_type();
        table.add_row(vec![
            Cell::new(msg_type.map(|t| t.to_string()).unwrap_or("-".into())),
            Cell::new(msg.len()),
            Cell::new(format!("{:06X}", msg.crc())),
            Cell::new(msg_type.and_then(describe).unwrap_or("-")),
            Cell::new(summary(msg)),
        ]);
    }
    println!("{table}");
}

fn summary(msg: &RtcmMessage) -> String {
    use rtcm_core::Decoded;

    match rtcm_core::decode(msg) {
        Some(Decoded::Station(p)) => format!(
            "station {} ({:.4}, {:.4}, {:.4})",
            p.station_id, p.ecef_x, p.ecef_y, p.ecef_z
        ),
        Some(Decoded::Antenna(a)) => format!("station {} antenna {}", a.station_id, a.descriptor),
        Some(Decoded::Text(t)) => format!("station {}: {}", t.station_id, t.text),
        Some(Decoded::GpsEphemeris(e)) => format!("G{:02} IODE {} toe {}", e.prn, e.iode, e.toe),
        Some(Decoded::GlonassEphemeris { ephemeris, .. }) => {
            format!("R{:02} tb {}", ephemeris.slot, ephemeris.tb)
        }
        Some(Decoded::GalileoEphemeris(e)) => format!("E{:02} IODnav {} toe {}", e.prn, e.iod_nav, e.toe),
        Some(Decoded::Msm(h)) => format!(
            "station {} {} sats x {} signals",
            h.station_id,
            h.satellites.len(),
            h.signals.len()
        ),
        None => "-".into(),
    }
}

fn cmd_station(mut cfg: Config, id: Option<u16>, x: Option<f64>, y: Option<f64>, z: Option<f64>, save: bool) {
    let station = &mut cfg.station;
    if let Some(id) = id {
        station.id = id;
    }
    station.ecef_x = x.or(station.ecef_x);
    station.ecef_y = y.or(station.ecef_y);
    station.ecef_z = z.or(station.ecef_z);

    let Some(pos) = station.position() else {
        eprintln!("Error: station position unknown; pass --x --y --z or set them in {}", config::config_file().display());
        std::process::exit(1);
    };

    let rtcm = Rtcm::new();
    println!("{}", rtcm.print_mt1005(&pos));
    if pos.antenna_height.is_some() {
        println!("{}", rtcm.print_mt1006(&pos));
    }
    if let Some(antenna) = &station.antenna {
        println!("{}", rtcm.print_mt1008(station.id, antenna, 0, ""));
    }

    if save {
        match config::save_config(&cfg) {
            Ok(path) => eprintln!("Saved {}", path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}
