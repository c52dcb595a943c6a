//! pgparmor CLI - OpenPGP ASCII armor
//!
//! Armors standard input (or a file) to standard output, or with `-d`
//! decodes the first armored block and writes the raw bytes.

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use log::debug;
use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;

use pgparmor::armor::DEFAULT_BLOCK_TYPE;
use pgparmor::{ArmorError, DecodeOptions, EncodeOptions, file_ops};

#[derive(Parser)]
#[command(name = "pgparmor")]
#[command(version)]
#[command(about = "Encode or decode OpenPGP ASCII armor.", long_about = None)]
struct Cli {
    /// Decode instead of encode
    #[arg(short, long)]
    decode: bool,

    /// Input file (standard input if omitted or "-")
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Write to FILE instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Block type named in the BEGIN and END lines when encoding
    #[arg(short = 't', long, value_name = "TYPE", default_value = DEFAULT_BLOCK_TYPE)]
    block_type: String,

    /// Armor header to emit when encoding; repeat to add more, in order
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// When decoding, require the END line to name the BEGIN line's block type
    #[arg(long)]
    strict: bool,

    /// When decoding, accept armor that has no checksum line
    #[arg(long)]
    no_checksum_required: bool,

    /// Log progress to standard error
    #[arg(short, long)]
    verbose: bool,
}

fn parse_header(arg: &str) -> Result<(String, String), String> {
    match arg.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim_start().to_string()))
        }
        _ => Err(format!("expected KEY: VALUE, got {:?}", arg)),
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(1);
            }
        },
    };

    init_logging(cli.verbose);

    let input = cli.file.as_deref();
    let output = cli.output.as_deref();
    let result = if cli.decode {
        let options = DecodeOptions::new()
            .strict_block_type(cli.strict)
            .require_checksum(!cli.no_checksum_required);
        file_ops::decode_file(input, output, &options).map(|info| {
            debug!(
                "decoded {} block with {} headers",
                info.block_type,
                info.headers.len()
            );
        })
    } else {
        let options = cli
            .headers
            .into_iter()
            .fold(EncodeOptions::new().block_type(cli.block_type), |options, (k, v)| {
                options.header(k, v)
            });
        file_ops::encode_file(input, output, &options)
    };

    if let Err(e) = result {
        eprintln!("Error: {}", describe(&e));
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// The error message followed by the messages of its sources.
fn describe(err: &ArmorError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
