// src/main.rs
//!
//! Command-line harness
//!
//! ```text
//! hashfs-connector <options.json> [--upload <file>]... < request.json
//! ```
//!
//! Runs a single request against the configured tree and prints the status,
//! the headers and the body. Logging goes to stderr, filtered by `RUST_LOG`.

use hashfs_connector::{Connector, ConnectorOptions, ReplyBody, Request, Upload};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn usage() -> ExitCode {
    eprintln!("usage: hashfs-connector <options.json> [--upload <file>]... < request.json");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(options_path) = args.next() else {
        return usage();
    };

    let mut uploads = Vec::new();
    while let Some(arg) = args.next() {
        match (arg.as_str(), args.next()) {
            ("--upload", Some(path)) => uploads.push(path),
            _ => return usage(),
        }
    }

    match run(Path::new(&options_path), uploads) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(options_path: &Path, uploads: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let options = ConnectorOptions::from_json_file(options_path)?;
    let connector = Connector::new(options)?;

    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw)?;
    let mut request = if raw.trim().is_empty() {
        Request::default()
    } else {
        Request::from_json(&raw)?
    };

    for path in uploads {
        let name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        request = request.with_upload(Upload::new(name, File::open(&path)?));
    }

    let reply = connector.run(request);
    println!("{}", reply.status);
    for (name, value) in &reply.headers {
        println!("{}: {}", name, value);
    }
    println!();

    match reply.body {
        ReplyBody::Document(document) => println!("{}", serde_json::to_string_pretty(&document)?),
        ReplyBody::Text(text) => println!("{}", text),
        ReplyBody::File(mut file) => {
            io::copy(&mut file, &mut io::stdout())?;
        }
    }

    Ok(())
}
