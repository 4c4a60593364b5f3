//! awkql CLI
//!
//! Reads the `#db` header line from stdin, translates the query, prints the
//! output header, and hands the rest of the stream to awk.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{FromRawFd, IntoRawFd};
use std::process::{Command, Stdio};

use anyhow::Context;
use clap::Parser;

use awkql::{Dialect, Schema, translate};

#[derive(Parser)]
#[command(name = "awkql")]
#[command(about = "Run SQL over tab-separated #db streams by compiling it to awk")]
#[command(after_help = "\
EXAMPLES:
    # Filter and project
    cat flows.db | awkql 'SELECT src, bytes WHERE bytes > 1000'

    # Bare filters project every column
    cat flows.db | awkql 'where ip_in_cidr(src, \"10.0.0.0/8\") = 1'

    # Aggregates group by the non-aggregate projections
    cat flows.db | awkql 'SELECT src, count(DISTINCT dst), sum(bytes)'

    # Inspect the generated program without running it
    cat flows.db | awkql --program 'SELECT count(*)'
")]
struct Args {
    /// SQL query text
    query: String,

    /// Use the gawk dialect (and run gawk instead of awk)
    #[arg(long)]
    gawk: bool,

    /// Print the generated awk program instead of running it
    #[arg(short = 'n', long)]
    program: bool,

    /// awk binary to run
    #[arg(long)]
    awk_bin: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let dialect = if args.gawk {
        Dialect::Gawk
    } else {
        Dialect::Portable
    };

    let header = read_header().context("failed to read #db header from stdin")?;
    let schema = Schema::parse_header(&header)?;
    log::debug!("input schema: {}", schema.header_line());

    let translation = translate(&args.query, &schema, dialect)?;

    if args.program {
        print!("{}", translation.program);
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", translation.output_schema.header_line())?;
    stdout.flush()?;
    drop(stdout);

    let bin = args.awk_bin.unwrap_or_else(|| {
        if args.gawk {
            "gawk".to_string()
        } else {
            "awk".to_string()
        }
    });
    let status = Command::new(&bin)
        .arg(&translation.program)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .status()
        .with_context(|| format!("failed to run {bin}"))?;
    std::process::exit(status.code().unwrap_or(1));
}

/// Read the header line from fd 0 one byte at a time, so nothing past the
/// newline is consumed and the data stream arrives intact at awk.
///
/// `std::io::Stdin` cannot be used here: it reads ahead into an internal
/// buffer, and anything buffered past the newline would be stranded there,
/// never reaching the awk child that inherits fd 0. Reading the raw fd
/// byte by byte leaves the stream positioned exactly after the header,
/// which is why the `unsafe` borrow of fd 0 is required.
fn read_header() -> io::Result<String> {
    // fd 0 stays open for the spawned awk process
    let mut stdin = unsafe { File::from_raw_fd(0) };
    let mut header = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stdin.read(&mut byte)?;
        if n == 0 || byte[0] == b'\n' {
            break;
        }
        header.push(byte[0]);
    }
    let _ = stdin.into_raw_fd();
    String::from_utf8(header).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
