use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use binstream::{
    DebugSink, DecodeRequest, DecoderRegistry, FileBacking, FileStream, StreamOptions, Tracker, Value, Whence,
};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "binstream", about = "Decode values from windows of binary files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a sequence of values, e.g. `uint32 uint16be string:8 hex:4`.
    Read {
        file: PathBuf,
        /// Decoders to apply in order, `name` or `name:len`.
        #[arg(required = true)]
        decoders: Vec<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Print the decoded-value trace to stderr.
        #[arg(long)]
        trace: bool,
        /// Emit the values as a JSON array.
        #[arg(long)]
        json: bool,
    },
    /// Write the selected window to a file.
    Dump {
        file: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Show where the selected window sits in the file.
    Info {
        file: PathBuf,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// List decoder names.
    Decoders,
}

#[derive(Args, Debug, Clone)]
struct WindowArgs {
    /// Window start, interpreted according to --whence.
    #[arg(long, allow_hyphen_values = true)]
    start: Option<i64>,
    /// Reference point for --start: start, current or end.
    #[arg(long, default_value = "start")]
    whence: Whence,
    /// Maximum window length in bytes.
    #[arg(long)]
    length: Option<u64>,
}

impl WindowArgs {
    fn options(&self) -> StreamOptions {
        StreamOptions {
            start: self.start,
            whence: self.whence,
            max_length: self.length,
        }
    }
}

fn open(file: &Path, window: &WindowArgs) -> Result<FileStream> {
    FileStream::open(file, window.options()).with_context(|| format!("failed to open {}", file.display()))
}

/// Decode `decoders` in order, pairing each value with the position it was read from.
fn decode_sequence(stream: &mut FileStream, decoders: &[String]) -> Result<Vec<(u64, DecodeRequest, Value)>> {
    let registry = DecoderRegistry::<FileBacking>::default();
    let mut out = Vec::with_capacity(decoders.len());
    for spec in decoders {
        let request: DecodeRequest = spec.parse()?;
        let pos = stream.tell();
        let value = registry
            .decode(stream, &request)
            .with_context(|| format!("decoding {request} at pos {pos}"))?;
        log::debug!("{request} @ {pos} = {value}");
        out.push((pos, request, value));
    }
    Ok(out)
}

fn cmd_read(file: &Path, decoders: &[String], window: &WindowArgs, trace: bool, json: bool) -> Result<()> {
    let tracker = Arc::new(Tracker::default());
    tracker.set_enabled(trace);
    let mut stream = open(file, window)?.with_sink(tracker.clone());

    let decoded = decode_sequence(&mut stream, decoders);
    if let Some(rendered) = tracker.render() {
        eprintln!("DEBUG BUFFER:\n{rendered}");
    }
    let decoded = decoded?;

    if json {
        let values: Vec<&Value> = decoded.iter().map(|(_, _, v)| v).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else {
        for (pos, request, value) in &decoded {
            println!("{pos:>8}  {:<12} {value}", request.to_string());
        }
    }
    if !stream.is_eof() {
        log::info!("{} bytes left undecoded", stream.remaining());
    }
    Ok(())
}

fn cmd_dump(file: &Path, output: &Path, window: &WindowArgs) -> Result<()> {
    let stream = open(file, window)?;
    stream
        .dump(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    eprintln!(
        "wrote {} bytes ({}..{}) to {}",
        stream.size(),
        stream.start(),
        stream.start() + stream.size(),
        output.display()
    );
    Ok(())
}

fn cmd_info(file: &Path, window: &WindowArgs) -> Result<()> {
    let stream = open(file, window)?;
    println!("file:   {}", file.display());
    println!("start:  {:#x} ({})", stream.start(), stream.start());
    println!("length: {}", stream.size());
    Ok(())
}

fn cmd_decoders() {
    for name in DecoderRegistry::<FileBacking>::default().names() {
        println!("{name}");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match &cli.command {
        Command::Read {
            file,
            decoders,
            window,
            trace,
            json,
        } => cmd_read(file, decoders, window, *trace, *json),
        Command::Dump { file, output, window } => cmd_dump(file, output, window),
        Command::Info { file, window } => cmd_info(file, window),
        Command::Decoders => {
            cmd_decoders();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_window_flags() {
        let cli = Cli::try_parse_from([
            "binstream", "read", "data.bin", "uint16", "string:4", "--start", "-8", "--whence", "end", "--length", "6",
        ])
        .unwrap();
        let Command::Read { decoders, window, .. } = cli.command else {
            panic!("expected read");
        };
        assert_eq!(decoders, ["uint16", "string:4"]);
        assert_eq!(
            window.options(),
            StreamOptions::new().start(-8).whence(Whence::End).max_length(6)
        );
    }

    #[test]
    fn rejects_unknown_whence() {
        assert!(Cli::try_parse_from(["binstream", "info", "data.bin", "--whence", "middle"]).is_err());
    }

    #[test]
    fn decodes_sequence_with_positions() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0xAA, 0x01, 0x00, b'o', b'k', 0]).unwrap();
        let window = WindowArgs {
            start: Some(1),
            whence: Whence::Start,
            length: None,
        };
        let mut stream = open(tmp.path(), &window).unwrap();
        let decoded = decode_sequence(&mut stream, &["uint16".into(), "string:3".into()]).unwrap();
        assert_eq!(
            decoded,
            vec![
                (0, DecodeRequest::new("uint16"), Value::UInt(1)),
                (2, DecodeRequest::sized("string", 3), Value::Text("ok".into())),
            ]
        );
    }

    #[test]
    fn decode_errors_name_the_request() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0x02]).unwrap();
        let window = WindowArgs {
            start: None,
            whence: Whence::Start,
            length: None,
        };
        let mut stream = open(tmp.path(), &window).unwrap();
        let err = decode_sequence(&mut stream, &["bool".into()]).unwrap_err();
        assert_eq!(err.to_string(), "decoding bool at pos 0");
    }
}
