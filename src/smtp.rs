use crate::config::SmtpConfig;
use crate::notify::NotificationMessage;
use log::{debug, info};
use openssl::ssl::{SslConnector, SslMethod, SslStream};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;

/// Applied to connect, read and write on the whole mail session.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

const EHLO_NAME: &str = "localhost";

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("SMTP I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TLS negotiation with {host} failed: {reason}")]
    Tls { host: String, reason: String },
    #[error("unexpected reply to {command}: expected {expected}, got: {reply}")]
    UnexpectedReply {
        command: String,
        expected: u16,
        reply: String,
    },
}

pub type Result<T> = std::result::Result<T, SmtpError>;

/// Sends the message through an authenticated STARTTLS submission session.
/// Any failure along the way aborts the session; there is no retry.
pub fn send(config: &SmtpConfig, message: &NotificationMessage) -> Result<()> {
    let addr = (config.host.as_str(), config.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", config.host),
            )
        })?;
    let stream = TcpStream::connect_timeout(&addr, SESSION_TIMEOUT)?;
    stream.set_read_timeout(Some(SESSION_TIMEOUT))?;
    stream.set_write_timeout(Some(SESSION_TIMEOUT))?;
    info!("Connected to {}:{}", config.host, config.port);

    let tls = TlsClient {
        host: config.host.clone(),
    };
    submit(stream, tls, config, message)
}

/// The STARTTLS upgrade step, separated from the dialogue so tests can run
/// the full command sequence over an in-memory stream.
trait StartTls<S> {
    type Stream: Read + Write;
    fn upgrade(self, stream: S) -> Result<Self::Stream>;
}

struct TlsClient {
    host: String,
}

impl StartTls<TcpStream> for TlsClient {
    type Stream = SslStream<TcpStream>;

    fn upgrade(self, stream: TcpStream) -> Result<SslStream<TcpStream>> {
        let connector = SslConnector::builder(SslMethod::tls())
            .map_err(|e| SmtpError::Tls {
                host: self.host.clone(),
                reason: e.to_string(),
            })?
            .build();
        connector.connect(&self.host, stream).map_err(|e| SmtpError::Tls {
            host: self.host,
            reason: e.to_string(),
        })
    }
}

/// EHLO, STARTTLS, EHLO again on the upgraded stream, authenticate, hand over
/// the message, QUIT. Reply codes are checked at every step.
fn submit<S, T>(stream: S, tls: T, config: &SmtpConfig, message: &NotificationMessage) -> Result<()>
where
    S: Read + Write,
    T: StartTls<S>,
{
    let mut session = Session::open(stream)?;
    session.command(&format!("EHLO {}", EHLO_NAME), "EHLO", 250)?;
    session.command("STARTTLS", "STARTTLS", 220)?;

    let stream = tls.upgrade(session.into_inner())?;
    let mut session = Session::resume(stream);
    session.command(&format!("EHLO {}", EHLO_NAME), "EHLO", 250)?;

    let token = base64::encode(format!("\0{}\0{}", config.user, config.pass));
    session.command(&format!("AUTH PLAIN {}", token), "AUTH PLAIN", 235)?;

    session.command(&format!("MAIL FROM:<{}>", message.from), "MAIL FROM", 250)?;
    session.command(&format!("RCPT TO:<{}>", message.to), "RCPT TO", 250)?;
    session.command("DATA", "DATA", 354)?;
    session.payload(&to_wire(message))?;
    session.command("QUIT", "QUIT", 221)?;
    Ok(())
}

struct Session<S: Read + Write> {
    stream: S,
}

impl<S: Read + Write> Session<S> {
    /// Wraps a freshly connected stream and consumes the server greeting.
    fn open(stream: S) -> Result<Self> {
        let mut session = Session { stream };
        session.expect("connection greeting", 220)?;
        Ok(session)
    }

    /// Wraps an upgraded stream mid-session; no greeting follows STARTTLS.
    fn resume(stream: S) -> Self {
        Session { stream }
    }

    fn into_inner(self) -> S {
        self.stream
    }

    /// Sends one command line and checks the reply code. `name` stands in
    /// for the raw line in errors, which keeps credentials out of them.
    fn command(&mut self, line: &str, name: &str, expected: u16) -> Result<String> {
        debug!("C: {}", name);
        write!(self.stream, "{}\r\n", line)?;
        self.stream.flush()?;
        self.expect(name, expected)
    }

    /// Writes the message after an accepted DATA command and terminates it
    /// with the lone-dot line.
    fn payload(&mut self, wire: &str) -> Result<String> {
        self.stream.write_all(wire.as_bytes())?;
        self.stream.write_all(b".\r\n")?;
        self.stream.flush()?;
        self.expect("DATA payload", 250)
    }

    fn expect(&mut self, command: &str, expected: u16) -> Result<String> {
        let (code, reply) = self.read_reply()?;
        debug!("S: {} {}", code, reply);
        if code == expected {
            Ok(reply)
        } else {
            Err(SmtpError::UnexpectedReply {
                command: command.to_owned(),
                expected,
                reply: format!("{} {}", code, reply),
            })
        }
    }

    /// Reads one full reply, following `250-`-style continuation lines until
    /// the final `250 `-style one.
    fn read_reply(&mut self) -> Result<(u16, String)> {
        let mut text = String::new();
        loop {
            let line = self.read_line()?;
            let code = line
                .get(..3)
                .and_then(|s| s.parse::<u16>().ok())
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("malformed SMTP reply: {}", line),
                    )
                })?;
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(line.get(4..).unwrap_or_default());
            if line.as_bytes().get(3) != Some(&b'-') {
                return Ok((code, text));
            }
        }
    }

    /// One byte at a time, so nothing past the current reply sits in a local
    /// buffer when the stream is handed to the TLS handshake.
    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if self.stream.read(&mut byte)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )
                .into());
            }
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("non-UTF-8 SMTP reply: {}", e))
                .into()
        })
    }
}

/// Renders the message as plain-text MIME with CRLF line endings and
/// dot-stuffed body lines, ready for the DATA phase.
fn to_wire(message: &NotificationMessage) -> String {
    let mut wire = format!(
        "MIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"utf-8\"\r\nSubject: {}\r\nFrom: {}\r\nTo: {}\r\n\r\n",
        message.subject, message.from, message.to
    );
    for line in message.body.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('.') {
            wire.push('.');
        }
        wire.push_str(line);
        wire.push_str("\r\n");
    }
    wire
}
