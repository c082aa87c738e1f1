// Command-line front-end for savestream encoding/decoding.
//
// Four subcommands over the file helpers in `io`: encode, decode, trim,
// info. Exit code 0 on success, 1 on any error.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::io::{self, IoError};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// v86 savestream encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "savestream",
    version,
    about = "Compress v86 save-state sequences into savestreams",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode save states into a savestream.
    Encode(EncodeArgs),
    /// Decode a savestream back into save states.
    Decode(DecodeArgs),
    /// Keep only a range of states, re-encoding the rest away.
    Trim(TrimArgs),
    /// Print savestream summary information.
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Input save states in sequence order, then the output savestream.
    #[arg(required = true, num_args = 2.., value_name = "FILES", value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Input savestream file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Directory for the decoded states (`<i>.bin` per state).
    #[arg(value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Decode only the state at this index.
    #[arg(long)]
    index: Option<usize>,
}

#[derive(Args, Debug)]
struct TrimArgs {
    /// Input savestream file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output savestream file.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// First state index to keep.
    start: usize,

    /// One past the last state index to keep (default: stream length).
    end: Option<usize>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Input savestream file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse arguments, run the requested subcommand, and exit.
pub fn run() {
    let cli = Cli::parse();
    let quiet = cli.quiet;
    let json_output = cli.json_output;

    let result = match cli.command {
        Cmd::Encode(args) => run_encode(args, quiet, json_output),
        Cmd::Decode(args) => run_decode(args, quiet, json_output),
        Cmd::Trim(args) => run_trim(args, quiet, json_output),
        Cmd::Info(args) => run_info(args),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("savestream: {e}");
            process::exit(1);
        }
    }
}

fn run_encode(args: EncodeArgs, quiet: bool, json_output: bool) -> Result<(), IoError> {
    // Clap guarantees at least two entries: inputs, then the output.
    let (output, inputs) = match args.files.split_last() {
        Some(split) => split,
        None => return Ok(()),
    };

    let stats = io::encode_files(inputs, output)?;

    if json_output {
        let json = serde_json::json!({
            "command": "encode",
            "states": stats.states,
            "input_bytes": stats.input_bytes,
            "stream_bytes": stats.stream_bytes,
            "stream_sha256": stats.stream_sha256.map(hex),
        });
        eprintln!("{json}");
    } else if !quiet {
        eprintln!(
            "savestream: encoded {} states ({} bytes) into {} ({} bytes)",
            stats.states,
            stats.input_bytes,
            output.display(),
            stats.stream_bytes
        );
    }
    Ok(())
}

fn run_decode(args: DecodeArgs, quiet: bool, json_output: bool) -> Result<(), IoError> {
    let stats = io::decode_to_dir(&args.input, &args.out_dir, args.index)?;

    if json_output {
        let json = serde_json::json!({
            "command": "decode",
            "states": stats.states,
            "stream_bytes": stats.stream_bytes,
            "output_bytes": stats.output_bytes,
        });
        eprintln!("{json}");
    } else if !quiet {
        eprintln!(
            "savestream: decoded {} states ({} bytes) into {}",
            stats.states,
            stats.output_bytes,
            args.out_dir.display()
        );
    }
    Ok(())
}

fn run_trim(args: TrimArgs, quiet: bool, json_output: bool) -> Result<(), IoError> {
    let stats = io::trim_file(&args.input, &args.output, args.start, args.end)?;

    if json_output {
        let json = serde_json::json!({
            "command": "trim",
            "kept": stats.kept,
            "stream_bytes": stats.stream_bytes,
        });
        eprintln!("{json}");
    } else if !quiet {
        eprintln!(
            "savestream: kept {} states in {} ({} bytes)",
            stats.kept,
            args.output.display(),
            stats.stream_bytes
        );
    }
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<(), IoError> {
    let info = io::stream_info(&args.input)?;
    println!("Savestream file: {}", args.input.display());
    println!("Number of save states: {}", info.states);
    println!("Savestream size: {} bytes", info.stream_bytes);
    if info.states > 0 {
        println!("Average bytes per frame: {:.2}", info.avg_frame_bytes);
    }
    Ok(())
}

fn hex(digest: [u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
