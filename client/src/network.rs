//! Client networking on a dedicated tokio runtime thread
//!
//! The render loop is synchronous, so the socket lives on its own thread and
//! talks to the UI through two bounded channels: server events in, user
//! commands out.

use log::{debug, error, info, warn};
use shared::codec::{read_packet, write_packet};
use shared::{ErrorCode, Grid, MatchId, Packet, Score, Side, ATTACH_ONLY};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

const CHANNEL_CAPACITY: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type SessionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// How the session obtains its seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    New,
    Join(MatchId),
}

/// Server messages forwarded to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Joined { match_id: MatchId, side: Side },
    State { turn: Side, board: Grid, score: Score },
    Error(ErrorCode),
    Left { match_id: MatchId },
    Disconnected,
}

/// User actions forwarded to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Drop a piece into a 1-based column
    Drop(i32),
    Quit,
}

/// UI-side handle to the network thread.
pub struct NetworkHandle {
    events: mpsc::Receiver<ServerEvent>,
    commands: mpsc::Sender<UserCommand>,
    thread: Option<JoinHandle<()>>,
}

impl NetworkHandle {
    /// Starts the network thread and begins the session.
    pub fn spawn(server: String, mode: StartMode) -> Self {
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let thread = std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start network runtime: {}", e);
                    let _ = event_tx.blocking_send(ServerEvent::Disconnected);
                    return;
                }
            };

            runtime.block_on(async move {
                if let Err(e) = run_session(&server, mode, event_tx.clone(), command_rx).await {
                    error!("Session with {} failed: {}", server, e);
                }
                let _ = event_tx.send(ServerEvent::Disconnected).await;
            });
        });

        Self {
            events: event_rx,
            commands: command_tx,
            thread: Some(thread),
        }
    }

    /// Next pending server event, without blocking.
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.events.try_recv().ok()
    }

    pub fn send(&self, command: UserCommand) {
        if let Err(e) = self.commands.try_send(command) {
            warn!("Dropping command {:?}: {}", command, e);
        }
    }

    /// Asks the session to leave its match and waits for the thread to exit.
    pub fn shutdown(mut self) {
        self.send(UserCommand::Quit);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Network thread panicked");
            }
        }
    }
}

/// Connects, obtains a seat, binds the stream and relays traffic until the
/// user quits or the server goes away.
pub async fn run_session(
    server: &str,
    mode: StartMode,
    events: mpsc::Sender<ServerEvent>,
    mut commands: mpsc::Receiver<UserCommand>,
) -> SessionResult {
    info!("Connecting to {}...", server);
    let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(server)).await??;
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    let request = match mode {
        StartMode::New => Packet::NewGame,
        StartMode::Join(match_id) => Packet::JoinGame { match_id },
    };
    write_packet(&mut writer, &request).await?;

    let (match_id, side) = match read_packet(&mut reader).await? {
        Some(Packet::Joined { match_id, side }) => (match_id, side),
        Some(Packet::Error { code }) => {
            events.send(ServerEvent::Error(code)).await?;
            return Ok(());
        }
        Some(other) => return Err(format!("unexpected reply {:?}", other).into()),
        None => return Err("server closed the connection".into()),
    };
    events.send(ServerEvent::Joined { match_id, side }).await?;

    write_packet(
        &mut writer,
        &Packet::Input {
            match_id,
            side,
            column: ATTACH_ONLY,
        },
    )
    .await?;

    let mut receiver = tokio::spawn(forward_events(reader, events));

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(UserCommand::Drop(column)) => {
                    debug!("Dropping into column {}", column);
                    write_packet(&mut writer, &Packet::Input { match_id, side, column }).await?;
                }
                Some(UserCommand::Quit) | None => {
                    info!("Leaving match {}", match_id);
                    write_packet(&mut writer, &Packet::LeaveGame { match_id, side }).await?;
                    // Give the server a moment to confirm before closing.
                    let _ = timeout(Duration::from_millis(200), &mut receiver).await;
                    receiver.abort();
                    return Ok(());
                }
            },
            _ = &mut receiver => {
                info!("Server closed the connection");
                return Ok(());
            }
        }
    }
}

/// Reads server packets and forwards them to the UI until the stream ends.
async fn forward_events(mut reader: OwnedReadHalf, events: mpsc::Sender<ServerEvent>) {
    loop {
        let event = match read_packet(&mut reader).await {
            Ok(Some(Packet::State { turn, board, score })) => ServerEvent::State { turn, board, score },
            Ok(Some(Packet::Error { code })) => ServerEvent::Error(code),
            Ok(Some(Packet::Left { match_id })) => {
                let _ = events.send(ServerEvent::Left { match_id }).await;
                return;
            }
            Ok(Some(other)) => {
                warn!("Unexpected packet {:?}", other);
                continue;
            }
            Ok(None) => return,
            Err(e) => {
                error!("Error receiving packet: {}", e);
                return;
            }
        };

        if events.send(event).await.is_err() {
            return;
        }
    }
}
