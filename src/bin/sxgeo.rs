//! sxgeo: CLI tool for querying Sypex Geo database files.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use sxgeo::{GeoLookup, Header, PackFormat, StorageMode, SxGeo, SxGeoConfig};

#[derive(Parser)]
#[command(name = "sxgeo")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Look up IPv4 addresses in Sypex Geo databases", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full info record for each address as JSON
    Lookup {
        /// Database file (SxGeo.dat or SxGeoCity.dat)
        db: PathBuf,

        /// IPv4 addresses in dotted-decimal form
        #[arg(required = true)]
        ips: Vec<String>,

        /// Storage mode: file, memory or mmap
        #[arg(short, long, default_value = "file")]
        mode: StorageMode,

        /// Pretty-print JSON
        #[arg(short, long)]
        pretty: bool,
    },

    /// Print the database header and pack format as JSON
    Info {
        /// Database file
        db: PathBuf,
    },
}

#[derive(Serialize)]
struct Info<'a> {
    header: &'a Header,
    pack_format: Option<&'a PackFormat>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Lookup {
            db,
            ips,
            mode,
            pretty,
        } => lookup(&db, &ips, mode, pretty),
        Commands::Info { db } => info(&db),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn lookup(path: &Path, ips: &[String], mode: StorageMode, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = SxGeo::open_with_config(path, SxGeoConfig::with_mode(mode))?;
    log::info!("Opened {:?} in {} mode", path, db.storage_mode());

    for ip in ips {
        let info = db.full_info(ip);
        if info.is_none() {
            log::info!("No data for {}", ip);
        }
        let json = if pretty {
            serde_json::to_string_pretty(&info)?
        } else {
            serde_json::to_string(&info)?
        };
        println!("{}", json);
    }

    Ok(())
}

fn info(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let db = SxGeo::open(path)?;
    let info = Info {
        header: db.header(),
        pack_format: db.pack_format(),
    };
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
