//! Headless driver: wires config, the router, and a single SSH session together for scripted use
//! and manual smoke-testing of the decode/style/document/project pipeline end to end. There is no
//! GUI in scope; this binary prints each projected frame to stdout as it arrives.
//!
//! Grounded on `r3bl-cmdr`'s `clap`-derived binary entry points (`cmdr/src/bin/*.rs`): a
//! `#[tokio::main]` entry, a `clap::Parser` args struct, and a `tracing_subscriber` init guarded
//! by a CLI flag, all returning `miette::Result`.

use clap::Parser;
use miette::IntoDiagnostic;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use floeterm::config::Settings;
use floeterm::router::messages::ControllerToUi;
use floeterm::router::MessageRouter;
use floeterm::transport::{ConnectParams, Ssh2ShellTransport, TransportReader};

/// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
#[derive(Debug, Parser)]
#[command(bin_name = "floeterm")]
#[command(about = "Interactive multi-session SSH terminal with an xterm-compatible core.")]
#[command(version)]
pub struct CliArgs {
    /// Remote host to open a shell on.
    pub hostname: String,

    /// SSH port.
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// SSH username.
    #[arg(long)]
    pub username: String,

    /// SSH password. Prompted interactively in a GUI; passed explicitly here since this binary is
    /// a headless driver.
    #[arg(long)]
    pub password: String,

    /// Visible rows of the pty, i.e. `page_line_count`.
    #[arg(long, default_value_t = 24)]
    pub rows: u32,

    /// Log app output to a file named `floeterm.log` for debugging.
    #[arg(long, short = 'l')]
    pub enable_logging: bool,
}

fn init_tracing(enable_logging: bool) -> miette::Result<()> {
    if !enable_logging {
        return Ok(());
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let file_appender = tracing_appender::rolling::never(".", "floeterm.log");
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file_appender)
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.enable_logging)?;

    let _settings = Settings::load();

    let session_id = Uuid::new_v4();
    let mut router = MessageRouter::new();
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    router.register_session(session_id, args.rows as usize, transport_tx);

    let params = ConnectParams {
        hostname: args.hostname,
        port: args.port,
        username: args.username,
        password: args.password,
    };
    let shell = Ssh2ShellTransport::connect(&params, args.rows).into_diagnostic()?;

    let (token_tx, mut token_rx) = mpsc::unbounded_channel();
    let (inactive_tx, mut inactive_rx) = mpsc::unbounded_channel();
    let mut reader = TransportReader::new(transport_rx, token_tx, inactive_tx);
    reader.add_session(session_id, Box::new(shell));

    let (_stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(reader.run(stop_rx));

    loop {
        tokio::select! {
            Some((sid, tokens)) = token_rx.recv() => {
                if let Some(doc) = router.document_mut(&sid) {
                    for token in tokens {
                        doc.apply_token(token);
                    }
                }
                if let Some(ControllerToUi::SessionViewContent(updates)) = router.flush_view_updates() {
                    for update in updates {
                        for line in &update.view.lines {
                            let text: String = line.iter().map(|r| r.text.as_str()).collect();
                            println!("{text}");
                        }
                    }
                }
            }
            Some(sid) = inactive_rx.recv() => {
                router.session_inactive(sid);
                println!("[session {sid} disconnected]");
                break;
            }
            else => break,
        }
    }

    Ok(())
}
