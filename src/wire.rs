//! Raw socket exchange shared by client & server
//!
//! There is no framing: a request ends when the client shuts down its write
//! side, and a reply ends when the server closes the connection.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:7777";

/// How much of a reply the client is willing to read
pub const MAX_REPLY_BYTES: u64 = 64;

/// Perform one full client exchange: connect, send the message bytes,
/// half-close to signal end-of-input, then read the reply.
///
/// Returns `None` when the server closed without sending anything.
pub fn exchange(addr: SocketAddr, message: &str) -> io::Result<Option<String>> {
    let mut stream = TcpStream::connect(addr)?;
    log::debug!("connected to {}", addr);

    stream.write_all(message.as_bytes())?;
    // Signal that the request is complete; the server reads until EOF
    stream.shutdown(Shutdown::Write)?;

    let reply = read_reply(&mut stream)?;
    Ok(if reply.is_empty() { None } else { Some(reply) })
}

/// Read at most `MAX_REPLY_BYTES` bytes until EOF and decode as UTF-8
pub fn read_reply(stream: &mut impl Read) -> io::Result<String> {
    let mut bytes = Vec::new();
    stream.take(MAX_REPLY_BYTES).read_to_end(&mut bytes)?;

    String::from_utf8(bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Reply is not valid utf8"))
}

/// Server-side dual of [`exchange`]: read the whole request until the
/// client's half-close delivers EOF
pub fn read_request(stream: &mut impl Read) -> io::Result<String> {
    let mut request = String::new();
    stream.read_to_string(&mut request)?;
    Ok(request)
}
