//! webpush CLI: operational tooling for Web Push
//!
//! Usage:
//!   webpush keygen [--json]
//!   webpush header <endpoint>
//!   webpush inspect <file>
//!   webpush send --subscription <file> [--message <text> | --input <file>] [--urgency <u>] [--ttl <secs>]
//!
//! Configuration (environment variables, for `header` and `send`):
//!   WEBPUSH_VAPID_PUBLIC_KEY      - base64 P-256 point
//!   WEBPUSH_VAPID_PRIVATE_KEY     - base64 P-256 scalar
//!   WEBPUSH_VAPID_SUBJECT         - mailto: or https: contact URI
//!   WEBPUSH_CHECK_STATUS          - "false" to report every status as delivered (default: true)
//!   WEBPUSH_REQUEST_TIMEOUT_SECS  - HTTP timeout (default: 15)
//!   WEBPUSH_LOG_FORMAT            - "json" for structured logging, "pretty" for dev
//!   RUST_LOG                      - tracing filter (default: webpush=info)

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use webpush_dispatch::{Dispatcher, PushConfig, PushMessage, Subscription, Urgency};
use webpush_envelope::encoding::encode_url_safe;
use webpush_envelope::wire::{self, AEAD_TAG_BYTES, HEADER_BYTES, MAX_RECORD_BYTES};
use webpush_envelope::{VapidKeys, VapidSigner};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "webpush")]
#[command(version)]
#[command(about = "Web Push encryption and delivery tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a VAPID key pair
    Keygen {
        /// Print as JSON instead of environment variable lines
        #[arg(long)]
        json: bool,
    },
    /// Print the Authorization header for a push endpoint
    Header {
        endpoint: String,
    },
    /// Show the header fields of an encrypted record (no decryption)
    Inspect {
        file: PathBuf,
    },
    /// Encrypt and deliver one message
    Send {
        /// PushSubscription JSON file
        #[arg(long)]
        subscription: PathBuf,
        /// Message text
        #[arg(long, conflicts_with = "input")]
        message: Option<String>,
        /// Read the payload from a file ("-" for stdin)
        #[arg(long)]
        input: Option<PathBuf>,
        /// very-low, low, normal or high
        #[arg(long)]
        urgency: Option<Urgency>,
        /// Time to live in seconds
        #[arg(long, default_value_t = 86_400)]
        ttl: u64,
    },
}

fn init_tracing() {
    let log_format = std::env::var("WEBPUSH_LOG_FORMAT").unwrap_or_else(|_| "pretty".into());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "webpush=info,webpush_dispatch=info".into());
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Keygen { json } => cmd_keygen(json),
        Commands::Header { endpoint } => cmd_header(&endpoint),
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::Send {
            subscription,
            message,
            input,
            urgency,
            ttl,
        } => cmd_send(&subscription, message, input.as_deref(), urgency, ttl).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_keygen(json: bool) -> CliResult {
    let keys = VapidKeys::generate();

    if json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
    } else {
        println!("WEBPUSH_VAPID_PUBLIC_KEY={}", keys.public_key);
        println!("WEBPUSH_VAPID_PRIVATE_KEY={}", keys.private_key);
    }

    eprintln!("Share the public key with browsers as applicationServerKey;");
    eprintln!("keep the private key secret.");

    Ok(())
}

fn cmd_header(endpoint: &str) -> CliResult {
    let config = PushConfig::from_env()?;
    let signer = VapidSigner::new(
        &config.vapid_public_key,
        &config.vapid_private_key,
        &config.vapid_subject,
    )?;

    println!("{}", signer.header(endpoint)?);
    Ok(())
}

fn cmd_inspect(path: &Path) -> CliResult {
    let record = fs::read(path)?;
    print!("{}", describe_record(&record)?);
    Ok(())
}

fn describe_record(record: &[u8]) -> Result<String, webpush_envelope::RecordError> {
    let header = wire::decode_header(record)?;
    let plaintext = header.ciphertext.len().saturating_sub(AEAD_TAG_BYTES + 1);

    let mut out = String::new();
    out.push_str("aes128gcm Record\n");
    out.push_str("================\n");
    out.push_str(&format!("Salt:            {}\n", encode_url_safe(header.salt)));
    out.push_str(&format!("Record Size:     {} bytes\n", header.record_size));
    out.push_str(&format!("Key Length:      0x{:02X}\n", header.key_length));
    out.push_str(&format!(
        "Sender Key:      {}\n",
        encode_url_safe(header.sender_public_key)
    ));
    out.push('\n');
    out.push_str(&format!("Total Size:      {} bytes\n", record.len()));
    out.push_str(&format!("Overhead:        {} bytes\n", HEADER_BYTES + AEAD_TAG_BYTES + 1));
    out.push_str(&format!("Plaintext Size:  ~{} bytes\n", plaintext));
    if record.len() > MAX_RECORD_BYTES {
        out.push_str(&format!("Warning:         exceeds {} byte push limit\n", MAX_RECORD_BYTES));
    }
    Ok(out)
}

async fn cmd_send(
    subscription_path: &Path,
    message: Option<String>,
    input: Option<&Path>,
    urgency: Option<Urgency>,
    ttl: u64,
) -> CliResult {
    let subscription = Subscription::from_json(&fs::read_to_string(subscription_path)?)?;

    let payload = match (message, input) {
        (Some(text), _) => text.into_bytes(),
        (None, Some(path)) if path == Path::new("-") => read_stdin()?,
        (None, Some(path)) => fs::read(path)?,
        (None, None) => read_stdin()?,
    };

    let config = PushConfig::from_env()?;
    let mut dispatcher = Dispatcher::with_reqwest(&config)?;

    let mut message = PushMessage::new(payload, Duration::from_secs(ttl));
    message.urgency = urgency;

    tracing::info!(
        endpoint = %subscription.endpoint,
        bytes = message.payload.len(),
        urgency = ?message.urgency,
        ttl_secs = ttl,
        "sending push message"
    );

    let outcome = dispatcher.send(&subscription, &message).await;
    dispatcher.shutdown().await;

    match outcome {
        Ok(delivery) => {
            eprintln!(
                "Delivered {} bytes -> HTTP {}",
                delivery.record_len, delivery.status
            );
            Ok(())
        }
        Err(e) => {
            if e.should_delete_subscription() {
                eprintln!("hint: delete this subscription, the push service no longer knows it");
            } else if e.is_retryable() {
                eprintln!("hint: the push service asked to retry later");
            }
            Err(e.into())
        }
    }
}

fn read_stdin() -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}
