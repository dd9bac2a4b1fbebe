//! SSH transport seam: byte source/sink for the decoder, specified only at its boundary per §1.
//!
//! Grounded on `remote_agent.py` (one reader task per remote host, multiplexed wait + wakeup,
//! `recv_all_session_responses`) and `ssh_client.py`/`ssh_shell.py` (pty allocation, per-session
//! send record). `ssh2`'s blocking I/O never yields a `WouldBlock`-shaped non-blocking read, so
//! each session's read loop runs on its own `spawn_blocking` task (the genuine
//! blocking-I/O-thread-pool model per §5) rather than being polled round-robin from one shared
//! task, which would let one idle or wedged remote host starve every other session sharing it.
//! `TransportReader` itself stays a plain async task: it only routes controller messages to the
//! per-session command channel and forwards decoded tokens back up.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::core::ansi::decoder::ByteStreamDecoder;
use crate::core::ansi::token::Token;
use crate::error::TransportError;
use crate::router::messages::SessionId;
use crate::router::ControllerToTransport;

/// Width negotiated at pty allocation time; height is `page_line_count`, computed from view
/// geometry per §6.
pub const PTY_WIDTH: u32 = 210;

/// How long a session's blocking read is allowed to wait before returning control to its own
/// thread to check for a queued write/close command.
const READ_TIMEOUT_MS: u32 = 20;

/// Connection parameters identifying one remote host + credential pair. Two sessions that log
/// into the same host with the same credentials share one underlying SSH connection, mirroring
/// `MainController`'s `agent_key` grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectParams {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// A single remote shell channel: read/write bytes, resize, close. Abstracted behind a trait so
/// the reader loop and tests don't depend on a live SSH connection.
pub trait ShellTransport: Send {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;
    fn resize(&mut self, width: u32, height: u32) -> std::io::Result<()>;
    fn close(&mut self);
}

/// `ssh2`-backed shell: a pty-allocated channel with `term=xterm` on an established session.
pub struct Ssh2ShellTransport {
    channel: ssh2::Channel,
}

impl Ssh2ShellTransport {
    /// Connects to `params.hostname:params.port`, authenticates, and opens a pty shell with
    /// `term=xterm`, `width=PTY_WIDTH`, `height=page_line_count`. The session's blocking calls
    /// are bounded to `READ_TIMEOUT_MS` so a session's dedicated blocking-read thread (see
    /// `TransportReader::add_session`) returns periodically to check for queued writes instead of
    /// blocking on the socket indefinitely.
    pub fn connect(params: &ConnectParams, page_line_count: u32) -> Result<Self, TransportError> {
        let tcp = std::net::TcpStream::connect((params.hostname.as_str(), params.port))
            .map_err(|source| TransportError::Connect {
                hostname: params.hostname.clone(),
                port: params.port,
                source,
            })?;
        tcp.set_nodelay(true).ok();

        let mut session = ssh2::Session::new().map_err(TransportError::Auth)?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(TransportError::Auth)?;
        session.set_keepalive(true, 3);
        session.set_timeout(READ_TIMEOUT_MS);
        session
            .userauth_password(&params.username, &params.password)
            .map_err(TransportError::Auth)?;

        let mut channel = session.channel_session().map_err(TransportError::Auth)?;
        channel
            .request_pty("xterm", None, Some((PTY_WIDTH, page_line_count, 0, 0)))
            .map_err(|e| TransportError::Shell(e.to_string()))?;
        channel.shell().map_err(|e| TransportError::Shell(e.to_string()))?;

        Ok(Self { channel })
    }
}

impl ShellTransport for Ssh2ShellTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> { Read::read(&mut self.channel, buf) }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> { Write::write_all(&mut self.channel, bytes) }

    fn resize(&mut self, width: u32, height: u32) -> std::io::Result<()> {
        self.channel
            .request_pty_size(width, height, None, None)
            .map_err(std::io::Error::other)
    }

    fn close(&mut self) {
        let _ = self.channel.close();
    }
}

/// A command routed from the controller down to one session's dedicated blocking-read thread.
enum SessionCmd {
    Write(Vec<u8>),
    Close,
}

/// Per-host transport reader: accepts newly opened shells and routes controller messages to each
/// session's own blocking-I/O thread, forwarding decoded tokens back to the controller.
pub struct TransportReader {
    /// Command channel into each session's dedicated blocking-read thread.
    sessions: HashMap<SessionId, std::sync::mpsc::Sender<SessionCmd>>,
    controller_inbox: mpsc::UnboundedReceiver<ControllerToTransport>,
    token_tx: mpsc::UnboundedSender<(SessionId, Vec<Token>)>,
    inactive_tx: mpsc::UnboundedSender<SessionId>,
}

impl TransportReader {
    pub fn new(
        controller_inbox: mpsc::UnboundedReceiver<ControllerToTransport>,
        token_tx: mpsc::UnboundedSender<(SessionId, Vec<Token>)>,
        inactive_tx: mpsc::UnboundedSender<SessionId>,
    ) -> Self {
        Self { sessions: HashMap::new(), controller_inbox, token_tx, inactive_tx }
    }

    /// Hands `transport` to a dedicated `spawn_blocking` task: each session gets its own blocking
    /// OS thread, so one idle or wedged remote host can never starve reads for any other session.
    pub fn add_session(&mut self, session_id: SessionId, transport: Box<dyn ShellTransport>) {
        tracing::debug!(%session_id, "adding session to transport reader");
        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
        self.sessions.insert(session_id, cmd_tx);

        let token_tx = self.token_tx.clone();
        let inactive_tx = self.inactive_tx.clone();
        tokio::task::spawn_blocking(move || {
            Self::run_session_blocking(session_id, transport, cmd_rx, token_tx, inactive_tx);
        });
    }

    /// Runs until `stop` fires, routing controller messages to each session's command channel.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        loop {
            if *stop.borrow() {
                break;
            }

            tokio::select! {
                _ = stop.changed() => {
                    if *stop.borrow() {
                        break;
                    }
                }
                msg = self.controller_inbox.recv() => {
                    match msg {
                        Some(msg) => self.handle_controller_msg(msg),
                        None => break,
                    }
                }
            }
        }
    }

    fn handle_controller_msg(&mut self, msg: ControllerToTransport) {
        match msg {
            ControllerToTransport::Write { session_id, bytes } => {
                if let Some(cmd_tx) = self.sessions.get(&session_id) {
                    let _ = cmd_tx.send(SessionCmd::Write(bytes));
                }
            }
            ControllerToTransport::RemoveSession { session_id } => {
                if let Some(cmd_tx) = self.sessions.remove(&session_id) {
                    tracing::debug!(%session_id, "removing session from transport reader");
                    let _ = cmd_tx.send(SessionCmd::Close);
                }
            }
            ControllerToTransport::Reconnect { session_id } => {
                tracing::debug!(%session_id, "reconnect requested; handled by the controller's login path");
            }
        }
    }

    /// One session's life on its own blocking thread: read with a bounded timeout, draining
    /// queued write/close commands between reads, until the shell errors out for real.
    fn run_session_blocking(
        session_id: SessionId,
        mut transport: Box<dyn ShellTransport>,
        cmd_rx: std::sync::mpsc::Receiver<SessionCmd>,
        token_tx: mpsc::UnboundedSender<(SessionId, Vec<Token>)>,
        inactive_tx: mpsc::UnboundedSender<SessionId>,
    ) {
        let mut decoder = ByteStreamDecoder::new();
        let mut last_sent: Vec<u8> = Vec::new();
        let mut buf = [0u8; 65536];

        loop {
            while let Ok(cmd) = cmd_rx.try_recv() {
                match cmd {
                    SessionCmd::Write(bytes) => {
                        if transport.write_all(&bytes).is_ok() {
                            last_sent = bytes;
                        }
                    }
                    SessionCmd::Close => {
                        transport.close();
                        return;
                    }
                }
            }

            match transport.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    let last = if last_sent.is_empty() { None } else { Some(last_sent.as_slice()) };
                    let tokens = decoder.feed(&buf[..n], last);
                    if !tokens.is_empty() && token_tx.send((session_id, tokens)).is_err() {
                        return;
                    }
                }
                Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(_) => {
                    tracing::debug!(%session_id, "shell read failed, marking session inactive");
                    let _ = inactive_tx.send(session_id);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// An in-memory shell for exercising the reader loop without a live SSH connection. Returns
    /// `WouldBlock` once `inbound` is drained, mirroring a non-blocking/timed-out read.
    #[derive(Default)]
    struct FakeShell {
        inbound: Arc<Mutex<VecDeque<u8>>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl ShellTransport for FakeShell {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let mut inbound = self.inbound.lock().unwrap();
            if inbound.is_empty() {
                return Err(std::io::Error::from(std::io::ErrorKind::WouldBlock));
            }
            let n = inbound.len().min(buf.len());
            for slot in buf.iter_mut().take(n) {
                *slot = inbound.pop_front().unwrap();
            }
            Ok(n)
        }

        fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            self.written.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        fn resize(&mut self, _width: u32, _height: u32) -> std::io::Result<()> { Ok(()) }

        fn close(&mut self) {}
    }

    #[tokio::test]
    async fn write_then_read_roundtrips_through_fake_transport() {
        let inbound = Arc::new(Mutex::new(VecDeque::from(b"hello".to_vec())));
        let written = Arc::new(Mutex::new(Vec::new()));
        let shell = FakeShell { inbound: inbound.clone(), written: written.clone() };

        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let (token_tx, mut token_rx) = mpsc::unbounded_channel();
        let (inactive_tx, _inactive_rx) = mpsc::unbounded_channel();
        let mut reader = TransportReader::new(ctrl_rx, token_tx, inactive_tx);
        let session_id = SessionId::new_v4();
        reader.add_session(session_id, Box::new(shell));

        let (_stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(reader.run(stop_rx));

        ctrl_tx
            .send(ControllerToTransport::Write { session_id, bytes: b"ls\n".to_vec() })
            .unwrap();

        let (got_session, tokens) = tokio::time::timeout(Duration::from_secs(1), token_rx.recv())
            .await
            .expect("should receive tokens before timeout")
            .expect("channel open");
        assert_eq!(got_session, session_id);
        assert_eq!(tokens, vec![Token::Plain("hello".to_string())]);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(written.lock().unwrap().as_slice(), b"ls\n");
    }

    #[tokio::test]
    async fn closing_a_session_stops_its_blocking_thread_without_a_panic() {
        let inbound = Arc::new(Mutex::new(VecDeque::new()));
        let written = Arc::new(Mutex::new(Vec::new()));
        let shell = FakeShell { inbound, written };

        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let (token_tx, _token_rx) = mpsc::unbounded_channel();
        let (inactive_tx, _inactive_rx) = mpsc::unbounded_channel();
        let mut reader = TransportReader::new(ctrl_rx, token_tx, inactive_tx);
        let session_id = SessionId::new_v4();
        reader.add_session(session_id, Box::new(shell));

        let (_stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(reader.run(stop_rx));

        ctrl_tx.send(ControllerToTransport::RemoveSession { session_id }).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
