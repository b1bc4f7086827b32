use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser as ClapParser};

use wiregate::{
    format_debug, format_headers_only, format_json, DocumentParser, MessageKind, ParserConfig,
};

/// wiregate CLI — streaming HTTP/1.x message parser.
///
/// Reads a raw HTTP message from a file, --raw string, or stdin and outputs
/// a structured representation in the chosen format.
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted so
/// you can pass a full HTTP message as a single shell argument.
#[derive(ClapParser)]
#[command(name = "wiregate-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing a raw HTTP message.
    /// Reads from stdin when neither FILE nor --raw is given.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Raw HTTP message string (escape sequences \r \n \t \\ are expanded).
    #[arg(long)]
    raw: Option<String>,

    /// What to parse the input as.
    #[arg(short, long, default_value = "auto", value_enum)]
    kind: KindArg,

    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Maximum allowed size of the start line plus header block, in bytes.
    #[arg(long, default_value = "81920")]
    max_header_size: u32,

    /// Accept header-value bytes outside the RFC set.
    #[arg(long)]
    lenient: bool,

    /// Accept Content-Length together with Transfer-Encoding: chunked.
    #[arg(long)]
    allow_chunked_length: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum KindArg {
    /// Decide from the first byte
    Auto,
    /// An HTTP request
    Request,
    /// An HTTP response
    Response,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable debug output
    Debug,
    /// Start line + headers only
    Headers,
    /// Re-serialized wire form
    Wire,
}

fn main() {
    let cli = Cli::parse();

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && cli.raw.is_none() && std::io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let data = match read_input(&cli) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    if data.is_empty() {
        eprintln!("Error: empty input");
        process::exit(1);
    }

    let kind = match cli.kind {
        KindArg::Auto => MessageKind::Either,
        KindArg::Request => MessageKind::Request,
        KindArg::Response => MessageKind::Response,
    };
    let config = ParserConfig {
        max_header_size: cli.max_header_size,
        lenient_headers: cli.lenient,
        allow_chunked_length: cli.allow_chunked_length,
    };

    let mut session = DocumentParser::with_config(kind, config);
    let consumed = session.feed(&data);
    if !session.is_done() && session.error().is_none() {
        // end of input doubles as connection close
        session.feed_eof();
    }
    if let Some(e) = session.error() {
        eprintln!("Parse error at byte {consumed}: {e} [{}]", e.name());
        process::exit(2);
    }
    if !session.is_done() {
        eprintln!("Parse error: incomplete message");
        process::exit(2);
    }

    let doc = session.into_document();
    match cli.format {
        OutputFormat::Json => print!("{}", format_json(&doc, cli.pretty)),
        OutputFormat::Debug => print!("{}", format_debug(&doc)),
        OutputFormat::Headers => print!("{}", format_headers_only(&doc)),
        OutputFormat::Wire => match doc.to_bytes() {
            Some(bytes) => {
                use std::io::Write;
                std::io::stdout().write_all(&bytes).ok();
            }
            None => {
                eprintln!("Error: document cannot be serialized");
                process::exit(2);
            }
        },
    }
}

/// Read raw HTTP bytes from --raw, a file, or stdin.
fn read_input(cli: &Cli) -> Result<Vec<u8>, std::io::Error> {
    if let Some(raw) = &cli.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &cli.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
