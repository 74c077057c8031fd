//! Model signing utility for Earlysign screening models.
//!
//! `keygen` creates an Ed25519 signing seed; `sign` writes a manifest
//! (`manifest.json`) binding the artifact's SHA-256 and an Ed25519 signature
//! (`model.sig`) next to it, so the loader can verify it at runtime.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_model -- keygen --out-seed keys/model_seed.b64
//! EARLYSIGN_MODEL_SIGNING_KEY_B64_FILE=keys/model_seed.b64 \
//!     cargo run --bin sign_model -- sign models/screening_model.json
//! ```
//!
//! # Security
//!
//! - Seed read from a file (or, in debug builds only, an env var)
//! - Seed written with 0600 permissions (Unix only)
//! - Private key material zeroized after use

use std::collections::BTreeMap;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::{Parser, Subcommand};
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use earlysign::adapters::model::{
    sha256_hex, ModelArtifact, ModelManifest, MANIFEST_FILE, SIGNATURE_FILE,
};

const KEY_FILE_ENV: &str = "EARLYSIGN_MODEL_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "EARLYSIGN_MODEL_SIGNING_KEY_B64";

#[derive(Parser)]
#[command(name = "sign_model")]
#[command(about = "Generate signing keys and sign screening model artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a signing seed and print its public key
    Keygen {
        /// Where to write the base64 seed
        #[arg(long)]
        out_seed: PathBuf,
        /// Also write the base64 public key here
        #[arg(long)]
        out_pub: Option<PathBuf>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Sign a model artifact
    Sign {
        /// Model artifact (JSON)
        artifact: PathBuf,
        /// Monotonic serial number, defaults to the current Unix time
        #[arg(long)]
        serial: Option<u64>,
    },
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    let content = if let Ok(path) = std::env::var(KEY_FILE_ENV) {
        Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        )
    } else if cfg!(debug_assertions) {
        // Dev-only fallback for convenience.
        match std::env::var(KEY_ENV) {
            Ok(v) => Zeroizing::new(v),
            Err(_) => bail!("Missing signing key. Set {KEY_FILE_ENV} (or {KEY_ENV} in debug builds)."),
        }
    } else {
        bail!("Missing signing key. Set {KEY_FILE_ENV}.");
    };

    let secret = content.trim().to_string();
    if secret.is_empty() {
        bail!("Empty signing key");
    }
    Ok(Zeroizing::new(secret))
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.as_str())
            .context("Invalid base64 in signing key")?,
    );
    if raw.len() != 32 {
        bail!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }
    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn write_secret(path: &Path, contents: &[u8], force: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut options = fs::OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create {path:?} (use --force to overwrite)"))?;
    std::io::Write::write_all(&mut file, contents)?;
    Ok(())
}

fn keygen(out_seed: &Path, out_pub: Option<&Path>, force: bool) -> Result<()> {
    let mut seed = Seed([0u8; 32]);
    rand::thread_rng().fill_bytes(&mut seed.0);

    let signing_key = SigningKey::from_bytes(&seed.0);
    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes());

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    write_secret(out_seed, format!("{}\n", seed_b64.as_str()).as_bytes(), force)?;

    if let Some(out_pub) = out_pub {
        if out_pub.exists() && !force {
            bail!("{out_pub:?} exists (use --force to overwrite)");
        }
        fs::write(out_pub, format!("{pub_b64}\n"))
            .with_context(|| format!("Failed to write {out_pub:?}"))?;
    }

    println!("Wrote signing seed: {out_seed:?}");
    println!("EARLYSIGN_MODEL_PUBKEY_B64={pub_b64}");
    Ok(())
}

fn sign(artifact: &Path, serial: Option<u64>) -> Result<()> {
    let bytes = fs::read(artifact).with_context(|| format!("Failed to read {artifact:?}"))?;
    ModelArtifact::from_json(&bytes)
        .with_context(|| format!("{artifact:?} is not a valid screening model"))?;

    let file_name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .context("Artifact path has no file name")?;
    let model_dir = artifact
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let created_at = unix_now();
    let manifest = ModelManifest {
        version: 1,
        serial: Some(serial.unwrap_or(created_at.max(1) as u64)),
        created_at: Some(created_at),
        files: BTreeMap::from([(file_name.to_string(), sha256_hex(&bytes))]),
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes()).with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "EARLYSIGN_MODEL_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Keygen {
            out_seed,
            out_pub,
            force,
        } => keygen(&out_seed, out_pub.as_deref(), force),
        Commands::Sign { artifact, serial } => sign(&artifact, serial),
    }
}
