/*
    spotify-liked-snapshot | Rust CLI tool to snapshot Liked Songs into datasets.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use log::debug;
use serde::Serialize;
use snapshot_core::{
    get_request_capability, pull_liked_snapshot, AuthMode, LikedTracksTable, SnapshotAssembler,
    SnapshotConfig, SnapshotError, SnapshotRun, SpotifyCredentials,
};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process;

const DEFAULT_OUT: &str = "data/raw/liked_songs.parquet";

#[derive(Parser)]
#[command(name = "liked-snapshot")]
#[command(about = "Snapshot your Spotify Liked Songs into a flat dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AuthArg {
    /// Browser consent, reusing the token cache when possible
    Interactive,
    /// Token cache only, never prompts
    Cached,
    /// Client credentials (no access to a user library)
    Service,
}

impl From<AuthArg> for AuthMode {
    fn from(arg: AuthArg) -> Self {
        match arg {
            AuthArg::Interactive => AuthMode::Interactive,
            AuthArg::Cached => AuthMode::CachedToken,
            AuthArg::Service => AuthMode::ServiceCredential,
        }
    }
}

#[derive(clap::Args)]
struct PullArgs {
    /// Maximum number of liked tracks to fetch
    #[arg(long, default_value_t = 1000)]
    max_tracks: usize,

    /// Market used for track relinking (e.g. US, SE, from_token)
    #[arg(long, default_value = "US")]
    market: String,

    /// Output file. A .csv suffix writes CSV, anything else Parquet
    #[arg(long, short = 'o', default_value = DEFAULT_OUT)]
    out: PathBuf,

    /// Do not write the snapshot to disk
    #[arg(long)]
    no_save: bool,

    /// How to authorize against Spotify
    #[arg(long, value_enum, default_value_t = AuthArg::Interactive)]
    auth: AuthArg,

    /// Number of rows to print after the pull
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Output a run report to a JSON file (e.g., --json=run.json)
    #[arg(long)]
    json: Option<String>,
}

impl Default for PullArgs {
    fn default() -> Self {
        Self {
            max_tracks: 1000,
            market: "US".to_string(),
            out: PathBuf::from(DEFAULT_OUT),
            no_save: false,
            auth: AuthArg::Interactive,
            preview: 5,
            json: None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetches Liked Songs and writes the snapshot (default command)
    Pull(PullArgs),
    /// Verifies the connection: shows the account and the first liked tracks
    Check {
        /// Market used for the sample tracks
        #[arg(long, default_value = "US")]
        market: String,
        /// How to authorize against Spotify
        #[arg(long, value_enum, default_value_t = AuthArg::Interactive)]
        auth: AuthArg,
    },
}

/// Summary written by `pull --json`.
#[derive(Serialize)]
struct RunReport<'a> {
    snapshot_utc: &'a str,
    fetched: usize,
    rows: usize,
    saved_to: Option<String>,
    format: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if dotenv().is_err() {
        // Silently ignore
    }

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Pull(PullArgs::default())) {
        Commands::Pull(args) => {
            handle_pull(args).await;
        }
        Commands::Check { market, auth } => {
            handle_check(&market, auth.into()).await;
        }
    }
}

fn load_credentials() -> SpotifyCredentials {
    match SpotifyCredentials::from_env() {
        Ok(creds) => creds,
        Err(e) => {
            eprintln!("[CONFIG] {}", e);
            eprintln!("Set them in the environment or in a .env file.");
            process::exit(2);
        }
    }
}

fn print_preview(table: &LikedTracksTable, n: usize) {
    if n == 0 || table.is_empty() {
        return;
    }
    println!();
    println!("{:<22} | {:<30} | {:<25}", "Track ID", "Name", "Artists");
    println!("{:-<22}-+-{:-<30}-+-{:-<25}", "", "", "");
    for row in table.head(n) {
        println!(
            "{:<22} | {:<30} | {:<25}",
            row.track_id,
            truncate(row.track_name.as_deref().unwrap_or_default(), 28),
            truncate(&row.artist_names, 23)
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}..", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

fn write_report(path: &str, run: &SnapshotRun) {
    let report = RunReport {
        snapshot_utc: run.table.snapshot_utc(),
        fetched: run.fetched,
        rows: run.table.len(),
        saved_to: run.saved.as_ref().map(|(p, _)| p.display().to_string()),
        format: run.saved.as_ref().map(|(_, f)| format!("{:?}", f)),
    };

    match File::create(path) {
        Ok(mut file) => {
            let json_content = serde_json::to_string_pretty(&report).unwrap_or_default();
            if let Err(e) = file.write_all(json_content.as_bytes()) {
                eprintln!();
                eprintln!("[ERROR] Failed to write report to file: {}", e);
            } else {
                println!();
                println!("[SAVED] Run report saved to: {}", path);
            }
        }
        Err(e) => eprintln!("[ERROR] Failed to create file '{}': {}", path, e),
    }
}

fn exit_code(err: &SnapshotError) -> i32 {
    if err.is_configuration() {
        2
    } else {
        1
    }
}

async fn handle_pull(args: PullArgs) {
    let creds = load_credentials();
    debug!("Token cache: {}", creds.cache_path.display());
    let config = SnapshotConfig {
        max_tracks: args.max_tracks,
        market: args.market,
        save_path: (!args.no_save).then_some(args.out),
    };

    println!(
        "Pulling up to {} Liked Songs (market {})...",
        config.max_tracks, config.market
    );

    match pull_liked_snapshot(&creds, args.auth.into(), &config).await {
        Ok(run) => {
            print_preview(&run.table, args.preview);

            println!();
            println!("---------------------------------------------------");
            println!("SNAPSHOT COMPLETE");
            println!("---------------------------------------------------");
            println!("Snapshot (UTC):   {}", run.table.snapshot_utc());
            println!("Entries Fetched:  {}", run.fetched);
            println!("Rows:             {}", run.table.len());
            match &run.saved {
                Some((path, format)) => {
                    println!("Saved To:         {} ({:?})", path.display(), format)
                }
                None => println!("Saved To:         (not saved)"),
            }
            println!("---------------------------------------------------");

            if let Some(path) = args.json.as_deref() {
                write_report(path, &run);
            }
        }
        Err(e) => {
            let code = exit_code(&e);
            eprintln!();
            eprintln!("[ERROR] Snapshot failed: {}", e);
            if let SnapshotError::Store { table, .. } = &e {
                eprintln!("{} rows were assembled but not written.", table.len());
            }
            process::exit(code);
        }
    }
}

async fn handle_check(market: &str, mode: AuthMode) {
    let creds = load_credentials();

    let session = match get_request_capability(&creds, mode).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error initializing Spotify client: {}", e);
            process::exit(1);
        }
    };

    match SnapshotAssembler::new(session).check_connection(market).await {
        Ok(report) => {
            println!(
                "[OK] Connected as: {} | country: {}",
                report.display_name.as_deref().unwrap_or("(unknown)"),
                report.country.as_deref().unwrap_or("(unknown)")
            );
            println!();
            println!("First {} liked tracks:", report.sample.len());
            for (i, line) in report.sample.iter().enumerate() {
                println!("{}. {}", i + 1, line);
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Connection check failed: {}", e);
            process::exit(exit_code(&e));
        }
    }
}
