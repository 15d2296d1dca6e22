//! linelog CLI Client
//!
//! Sends messages to a linelog server and prints the echoed log.

use std::io::{self, BufRead, Read, Write};
use std::net::TcpStream;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

/// linelog CLI
#[derive(Parser, Debug)]
#[command(name = "linelog-cli")]
#[command(about = "CLI for the linelog server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    server: String,

    /// Milliseconds of silence that end an echo
    #[arg(long, default_value = "300")]
    idle_ms: u64,

    /// Messages to send (one per argument); reads stdin lines when empty
    messages: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("linelog-cli: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> io::Result<()> {
    let mut stream = TcpStream::connect(&args.server)?;
    stream.set_read_timeout(Some(Duration::from_millis(args.idle_ms)))?;

    let messages: Vec<String> = if args.messages.is_empty() {
        io::stdin().lock().lines().collect::<io::Result<_>>()?
    } else {
        args.messages.clone()
    };

    let stdout = io::stdout();
    for message in messages {
        stream.write_all(message.as_bytes())?;
        stream.write_all(b"\n")?;

        let echo = read_until_idle(&mut stream)?;
        let mut out = stdout.lock();
        out.write_all(&echo)?;
        out.flush()?;
    }

    Ok(())
}

/// Read whatever the server sends until it goes quiet or closes
fn read_until_idle(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut echo = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Ok(echo),
            Ok(n) => echo.extend_from_slice(&buf[..n]),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(echo)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
