//! Log output setup.
//!
//! Every event goes to stdout and to the append-mode log file, each line
//! prefixed with a local `YYYY/MM/DD HH:MM:SS` timestamp. When enabled, events
//! are also relayed to a syslog endpoint as RFC 3164 messages. Neither the
//! log file nor syslog is required: if either cannot be opened a warning is
//! logged and the process carries on without it.

use crate::config::{Config, SyslogConfig};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::{TcpStream, UdpSocket};
use std::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, format::Writer, time::FormatTime};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Program name used as the syslog tag.
pub const SYSLOG_TAG: &str = "mvGo";

/// `LOG_USER | LOG_INFO`.
const SYSLOG_PRIORITY: u8 = (1 << 3) | 6;

/// Keeps the background log-file writer alive. Dropping it flushes pending
/// lines.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Formats timestamps as local `2006/01/02 15:04:05`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y/%m/%d %H:%M:%S"))
    }
}

/// A subscriber ready to install, with what it needs kept alive.
pub struct LogSetup<S> {
    pub subscriber: S,
    pub guard: LogGuard,
    /// Problems met while opening outputs, to be logged once the subscriber
    /// is active.
    pub warnings: Vec<String>,
}

/// Installs the global subscriber.
///
/// `verbose` raises the default level from `info` to `debug`; `RUST_LOG`
/// overrides both.
pub fn init(config: &Config, verbose: bool) -> LogGuard {
    let setup = build(config, verbose);
    setup.subscriber.init();

    for warning in setup.warnings {
        tracing::warn!("{}", warning);
    }

    setup.guard
}

/// Builds the subscriber without installing it.
pub fn build(
    config: &Config,
    verbose: bool,
) -> LogSetup<impl tracing::Subscriber + Send + Sync + 'static> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let mut warnings = Vec::new();

    let (file_layer, file_guard) = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
    {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_timer(LocalTimer);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            warnings.push(format!(
                "Error opening log file {}: {}",
                config.log_file.display(),
                e
            ));
            (None, None)
        }
    };

    let syslog_layer = if config.syslog.enabled && !config.syslog.address.is_empty() {
        match SyslogWriter::connect(&config.syslog) {
            Ok(writer) => Some(
                fmt::layer()
                    .with_writer(Mutex::new(writer))
                    .with_ansi(false)
                    .with_target(false)
                    .without_time(),
            ),
            Err(e) => {
                warnings.push(format!("Failed to connect to syslog: {}", e));
                None
            }
        }
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_timer(LocalTimer))
        .with(file_layer)
        .with(syslog_layer);

    LogSetup {
        subscriber,
        guard: LogGuard { _file: file_guard },
        warnings,
    }
}

enum Transport {
    Udp(UdpSocket),
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    #[cfg(unix)]
    UnixDatagram(std::os::unix::net::UnixDatagram),
}

impl Transport {
    fn open(network: &str, address: &str) -> io::Result<Self> {
        match network {
            "udp" | "udp4" | "udp6" => {
                let bind = if network == "udp6" { "[::]:0" } else { "0.0.0.0:0" };
                let socket = UdpSocket::bind(bind)?;
                socket.connect(address)?;
                Ok(Transport::Udp(socket))
            }
            "tcp" | "tcp4" | "tcp6" => Ok(Transport::Tcp(TcpStream::connect(address)?)),
            #[cfg(unix)]
            "unix" => Ok(Transport::Unix(std::os::unix::net::UnixStream::connect(
                address,
            )?)),
            #[cfg(unix)]
            "unixgram" => {
                let socket = std::os::unix::net::UnixDatagram::unbound()?;
                socket.connect(address)?;
                Ok(Transport::UnixDatagram(socket))
            }
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported syslog network {:?}", other),
            )),
        }
    }

    fn is_local(&self) -> bool {
        match self {
            Transport::Udp(_) | Transport::Tcp(_) => false,
            #[cfg(unix)]
            Transport::Unix(_) | Transport::UnixDatagram(_) => true,
        }
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        match self {
            Transport::Udp(socket) => socket.send(frame).map(|_| ()),
            Transport::Tcp(stream) => stream.write_all(frame),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.write_all(frame),
            #[cfg(unix)]
            Transport::UnixDatagram(socket) => socket.send(frame).map(|_| ()),
        }
    }
}

/// Relays formatted log lines to a syslog daemon.
///
/// Each `write` call carries one complete event from the fmt layer and is
/// framed as one syslog message.
pub struct SyslogWriter {
    network: String,
    address: String,
    hostname: String,
    transport: Transport,
}

impl SyslogWriter {
    /// Connects to the endpoint described by `config`.
    pub fn connect(config: &SyslogConfig) -> io::Result<Self> {
        let transport = Transport::open(&config.network, &config.address)?;
        Ok(Self {
            network: config.network.clone(),
            address: config.address.clone(),
            hostname: hostname(),
            transport,
        })
    }

    fn frame(&self, message: &str) -> String {
        let pid = std::process::id();
        if self.transport.is_local() {
            format!(
                "<{}>{} {}[{}]: {}\n",
                SYSLOG_PRIORITY,
                Local::now().format("%b %e %H:%M:%S"),
                SYSLOG_TAG,
                pid,
                message
            )
        } else {
            format!(
                "<{}>{} {} {}[{}]: {}\n",
                SYSLOG_PRIORITY,
                Local::now().to_rfc3339(),
                self.hostname,
                SYSLOG_TAG,
                pid,
                message
            )
        }
    }
}

impl Write for SyslogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let message = String::from_utf8_lossy(buf);
        let message = message.trim_end_matches('\n');
        if message.is_empty() {
            return Ok(buf.len());
        }

        let frame = self.frame(message);
        if self.transport.send(frame.as_bytes()).is_err() {
            // Stream sockets drop when the daemon restarts; reconnect once.
            self.transport = Transport::open(&self.network, &self.address)?;
            self.transport.send(frame.as_bytes())?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.transport {
            Transport::Tcp(stream) => stream.flush(),
            _ => Ok(()),
        }
    }
}

fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
