use std::io::{self, BufRead, Write};
use std::net::SocketAddr;

use structopt::StructOpt;

use tcp_kv::wire::{exchange, DEFAULT_SERVER_ADDR};

#[derive(Debug, StructOpt)]
#[structopt(name = "client")]
struct Args {
    /// Server destination address
    #[structopt(long, default_value = DEFAULT_SERVER_ADDR, global = true)]
    addr: SocketAddr,
}

/// Prompt loop: each non-empty line is sent on a fresh connection, with the
/// send side half-closed so the server knows the request is complete.
fn main() -> io::Result<()> {
    env_logger::init();
    let args = Args::from_args();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        write!(stdout, "Enter message (or 'quit' to exit): ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            // stdin closed
            break;
        }
        let message = line.trim_end_matches(&['\r', '\n'][..]);
        if message.eq_ignore_ascii_case("quit") {
            break;
        }
        if message.is_empty() {
            continue;
        }

        match exchange(args.addr, message) {
            Ok(Some(reply)) => println!("Received: {}", reply),
            Ok(None) => println!("No response received."),
            Err(e) => println!("Error: {}", e),
        }
    }
    Ok(())
}
