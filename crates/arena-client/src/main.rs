// crates/arena-client/src/main.rs

use anyhow::Result;
use arena_client::app::App;
use arena_client::commands::{parse_command, Command, HELP};
use arena_client::network::{self, ArenaConnection};
use arena_core::{InputMessage, SessionId};
use arena_protocol::ServerFrame;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "arena-client")]
#[clap(about = "Terminal client for the slot arena")]
struct Cli {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:9000")]
    server: String,

    /// Session token issued by the session provider
    #[clap(short = 't', long)]
    session: String,

    /// Register this nickname for the session before connecting
    #[clap(short, long)]
    nickname: Option<String>,

    /// Print timer updates
    #[clap(long)]
    timers: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they do not interleave with events on stdout.
    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let session = SessionId::new(cli.session.clone());

    if let Some(nickname) = &cli.nickname {
        match network::set_nickname(&cli.server, &session, nickname).await {
            Ok(()) => println!("* nickname {} registered", nickname),
            Err(e) => println!("* nickname not registered: {}", e),
        }
    }

    let mut app = App::new();
    app.show_timers = cli.timers;
    run_app(app, &cli.server, session).await
}

async fn run_app(mut app: App, server_addr: &str, session: SessionId) -> Result<()> {
    // Create channels for network communication
    let (tx_to_network, rx_from_app) = mpsc::unbounded_channel::<InputMessage>();
    let (tx_to_app, mut rx_from_network) = mpsc::unbounded_channel::<ServerFrame>();

    let mut connection = ArenaConnection::new(server_addr, session, tx_to_app);
    connection.connect().await?;

    let network_handle = tokio::spawn(async move {
        connection.run(rx_from_app).await;
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    println!("type :help for commands");

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(Some(Command::Send(msg))) => {
                        if tx_to_network.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(Some(Command::ToggleTimers)) => app.show_timers = !app.show_timers,
                    Ok(Some(Command::Help)) => println!("{}", HELP),
                    Ok(Some(Command::Quit)) => break,
                    Ok(None) => {}
                    Err(e) => println!("* {}", e),
                }
            }

            frame = rx_from_network.recv() => {
                let Some(frame) = frame else {
                    println!("* disconnected");
                    break;
                };
                for line in app.handle_frame(frame) {
                    println!("{}", line);
                }
                if app.logged_out || app.denied.is_some() {
                    break;
                }
            }
        }
    }

    info!(messages = app.message_count, "exiting");
    network_handle.abort();
    Ok(())
}
