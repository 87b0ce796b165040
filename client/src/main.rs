//! `dead-drop-client`: CLI front end for the dead-drop protocol driver.
//!
//! Subcommands mirror the original Go client's `cobra` tree (`drop`,
//! `pull`, `add-key`, `gen-key`), translated to `clap`'s derive API.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dead_drop_common::crypto;
use dead_drop_common::error::DeadDropError;
use tracing::error;

use dead_drop_client::config::ClientConfig;
use dead_drop_client::driver::Driver;
use dead_drop_client::keygen;

#[derive(Parser, Debug)]
#[command(name = "dead-drop-client", about = "Client for the dead-drop object service")]
struct Cli {
    /// Server base URL, e.g. https://drop.example.com:4444
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Path to the caller's RSA private key (PKCS#1 PEM).
    #[arg(long, global = true)]
    private_key: Option<String>,

    /// Registered key name identifying the caller.
    #[arg(long, global = true)]
    key_name: Option<String>,

    /// Path to a client config file overriding the default location.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file and print the assigned OID.
    Drop { path: PathBuf },
    /// Download an object by OID to a destination file.
    Pull { oid: String, dest: PathBuf },
    /// Register a public key under a name.
    AddKey { pub_path: PathBuf, name: String },
    /// Generate a fresh RSA-4096 keypair.
    GenKey { priv_path: PathBuf, pub_path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).compact().init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), DeadDropError> {
    let cli = Cli::parse();
    let file_config = ClientConfig::load(cli.config.as_deref())?;

    if let Command::GenKey { priv_path, pub_path } = &cli.command {
        keygen::generate_keypair_files(priv_path, pub_path)?;
        println!("wrote {} and {}", priv_path.display(), pub_path.display());
        return Ok(());
    }

    let remote = cli
        .remote
        .or(file_config.remote)
        .ok_or_else(|| DeadDropError::bad_request("--remote is required"))?;
    let key_name = cli
        .key_name
        .or(file_config.key_name)
        .ok_or_else(|| DeadDropError::bad_request("--key-name is required"))?;
    let private_key_path = cli
        .private_key
        .or(file_config.private_key)
        .ok_or_else(|| DeadDropError::bad_request("--private-key is required"))?;

    let private_key_pem = fs::read_to_string(&private_key_path)
        .map_err(|e| DeadDropError::internal(format!("failed to read private key: {e}")))?;
    let private_key = crypto::private_key_from_pem(&private_key_pem)?;

    let driver = Driver::new(remote, key_name, private_key);

    match cli.command {
        Command::Drop { path } => {
            let bytes = fs::read(&path)
                .map_err(|e| DeadDropError::internal(format!("failed to read {}: {e}", path.display())))?;
            let oid = driver.drop(bytes).await?;
            println!("{oid}");
        }
        Command::Pull { oid, dest } => {
            let bytes = driver.pull(&oid).await?;
            fs::write(&dest, bytes)
                .map_err(|e| DeadDropError::internal(format!("failed to write {}: {e}", dest.display())))?;
        }
        Command::AddKey { pub_path, name } => {
            let pem_bytes = fs::read(&pub_path)
                .map_err(|e| DeadDropError::internal(format!("failed to read {}: {e}", pub_path.display())))?;
            driver.add_key(&name, pem_bytes).await?;
        }
        Command::GenKey { .. } => unreachable!("handled above"),
    }

    Ok(())
}
