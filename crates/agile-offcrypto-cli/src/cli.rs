use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use agile_offcrypto::{
    decrypt_encrypted_package, parse_encrypted_package_stream, verify_and_recover_key,
    verify_data_integrity, AgileCryptoError, DecryptOptions, DEFAULT_MAX_SPIN_COUNT,
    DEFAULT_MAX_TOTAL_SIZE,
};
use anyhow::{Context, Result};
use clap::Parser;
use zeroize::Zeroizing;

use crate::descriptor_file::DescriptorFile;

/// Exit status for a password that fails verification.
pub const EXIT_WRONG_PASSWORD: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "agile-decrypt",
    about = "Verify a password against an Agile-encrypted Office package and decrypt it."
)]
pub struct Args {
    /// JSON file holding the `EncryptionInfo` parameters (base64 for binary fields).
    #[arg(long, value_name = "PATH")]
    descriptor: PathBuf,

    /// Raw `EncryptedPackage` stream (8-byte size prefix followed by ciphertext).
    #[arg(long, value_name = "PATH")]
    input: PathBuf,

    /// Password to try.
    #[arg(long, required_unless_present = "password_file")]
    password: Option<String>,

    /// Read the password from a file (trailing newlines are trimmed).
    #[arg(long, value_name = "PATH", conflicts_with = "password")]
    password_file: Option<PathBuf>,

    /// Where to write the decrypted package (default: stdout).
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Only check the password; do not decrypt.
    #[arg(long)]
    verify_only: bool,

    /// Check the `dataIntegrity` HMAC before decrypting.
    #[arg(long)]
    verify_integrity: bool,

    /// Reject packages that declare more plaintext bytes than this.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_TOTAL_SIZE)]
    max_total_size: u64,

    /// Reject descriptors with a larger `spinCount`.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_SPIN_COUNT)]
    max_spin_count: u32,

    /// Decrypt segments on the calling thread only.
    #[arg(long)]
    sequential: bool,
}

impl Args {
    fn options(&self) -> DecryptOptions {
        DecryptOptions {
            max_total_size: Some(self.max_total_size),
            max_spin_count: Some(self.max_spin_count),
            verify_integrity: self.verify_integrity,
            parallel: !self.sequential,
        }
    }

    fn password(&self) -> Result<Zeroizing<String>> {
        if let Some(path) = self.password_file.as_deref() {
            let value = Zeroizing::new(
                std::fs::read_to_string(path)
                    .with_context(|| format!("read password file {}", path.display()))?,
            );
            Ok(Zeroizing::new(
                value.trim_end_matches(&['\r', '\n'][..]).to_string(),
            ))
        } else {
            let password = self
                .password
                .clone()
                .context("either --password or --password-file is required")?;
            Ok(Zeroizing::new(password))
        }
    }
}

/// Install the stderr `tracing` subscriber; `RUST_LOG` overrides the default `warn` level.
///
/// Library diagnostics emitted through `log` are forwarded to the same subscriber.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match run_with_args(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    }
}

/// Map an error to the process exit status: 2 for a wrong password, 1 otherwise.
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<AgileCryptoError>() {
        Some(AgileCryptoError::WrongPassword) => ExitCode::from(EXIT_WRONG_PASSWORD),
        _ => ExitCode::FAILURE,
    }
}

pub fn run_with_args(args: Args) -> Result<()> {
    let password = args.password()?;
    let options = args.options();

    let stream = std::fs::read(&args.input)
        .with_context(|| format!("read EncryptedPackage {}", args.input.display()))?;
    let package = parse_encrypted_package_stream(&stream)
        .with_context(|| format!("parse EncryptedPackage {}", args.input.display()))?;
    let descriptor = DescriptorFile::read(&args.descriptor)?.into_descriptor(package.total_size)?;

    tracing::debug!(
        hash = %descriptor.hash_algorithm,
        key_bits = descriptor.key_bits,
        chaining = %descriptor.cipher_chaining,
        spin_count = descriptor.spin_count,
        total_size = descriptor.total_size,
        "loaded descriptor"
    );

    if args.verify_only {
        options.check_limits(&descriptor)?;
        let key = verify_and_recover_key(&password, &descriptor)?;
        if args.verify_integrity {
            verify_data_integrity(&stream, key.as_bytes(), &descriptor)?;
            tracing::info!("dataIntegrity HMAC verified");
        }
        println!("password OK");
        return Ok(());
    }

    let plaintext = Zeroizing::new(decrypt_encrypted_package(
        &stream,
        &password,
        &descriptor,
        &options,
    )?);
    tracing::info!(bytes = plaintext.len(), "decrypted EncryptedPackage");

    match &args.output {
        Some(path) => std::fs::write(path, plaintext.as_slice())
            .with_context(|| format!("write {}", path.display()))?,
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(&plaintext)?;
            handle.flush()?;
        }
    }
    Ok(())
}
