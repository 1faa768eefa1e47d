//! Server network layer: TCP accept loop, per-connection tasks and match reaping

use crate::protocol::ProtocolHandler;
use crate::registry::Registry;
use log::{debug, error, info, warn};
use shared::codec::{read_packet, write_packet};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Tunables for a running server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of live matches
    pub max_matches: usize,
    /// Capacity of each connection's inbound and outbound packet queues
    pub queue_capacity: usize,
    /// How long a match may sit with no attached stream before removal
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_matches: 1024,
            queue_capacity: 32,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Boxed error for server setup and the accept loop; `Send` so the server can
/// run on a spawned task.
pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// Accepts connections and hands each one to a protocol handler
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    config: ServerConfig,
}

impl Server {
    /// Binds the listener. A zero queue capacity is raised to one.
    pub async fn new(addr: &str, mut config: ServerConfig) -> Result<Self, ServerError> {
        config.queue_capacity = config.queue_capacity.max(1);
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            registry: Arc::new(Registry::new(config.max_matches)),
            config,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Spawns task that periodically removes abandoned matches
    fn spawn_timeout_checker(&self) {
        let registry = Arc::clone(&self.registry);
        let idle_timeout = self.config.idle_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let reaped = registry.reap_idle(idle_timeout);
                if !reaped.is_empty() {
                    debug!("Reaped {} idle matches, {} live", reaped.len(), registry.len());
                }
            }
        });
    }

    /// Splits a connection into reader, writer and protocol tasks
    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let (reader, writer) = stream.into_split();
        let (inbound_tx, inbound_rx) = mpsc::channel(self.config.queue_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.queue_capacity);

        tokio::spawn(network_receiver(reader, inbound_tx, addr));
        tokio::spawn(network_sender(writer, outbound_rx, addr));

        let handler = ProtocolHandler::new(Arc::clone(&self.registry), outbound_tx, addr.to_string());
        tokio::spawn(handler.run(inbound_rx));
    }

    /// Main server loop accepting connections until the task is cancelled
    pub async fn run(self) -> Result<(), ServerError> {
        self.spawn_timeout_checker();

        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Connection from {}", addr);
                    self.spawn_connection(stream, addr);
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// Decodes frames from the socket into the inbound queue.
///
/// Waits when the queue is full, so a client that floods the server is
/// throttled by TCP flow control instead of growing memory.
async fn network_receiver(mut reader: OwnedReadHalf, inbound: mpsc::Sender<Packet>, addr: SocketAddr) {
    loop {
        match read_packet(&mut reader).await {
            Ok(Some(packet)) => {
                if inbound.send(packet).await.is_err() {
                    debug!("Handler for {} is gone, stop reading", addr);
                    break;
                }
            }
            Ok(None) => {
                info!("{} closed the connection", addr);
                break;
            }
            Err(e) => {
                warn!("Dropping connection {}: {}", addr, e);
                break;
            }
        }
    }
}

/// Writes queued packets to the socket until every sender is dropped.
async fn network_sender(mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<Packet>, addr: SocketAddr) {
    while let Some(packet) = outbound.recv().await {
        if let Err(e) = write_packet(&mut writer, &packet).await {
            error!("Failed to send packet to {}: {}", addr, e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Side, ATTACH_ONLY};

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_matches, 1024);
        assert_eq!(config.queue_capacity, 32);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = Server::new("127.0.0.1:0", ServerConfig::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn test_zero_queue_capacity_is_clamped() {
        let config = ServerConfig {
            queue_capacity: 0,
            ..ServerConfig::default()
        };
        let server = Server::new("127.0.0.1:0", config).await.unwrap();
        assert_eq!(server.config.queue_capacity, 1);

        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_packet(&mut stream, &Packet::NewGame).await.unwrap();
        assert!(matches!(
            read_packet(&mut stream).await.unwrap(),
            Some(Packet::Joined { .. })
        ));
    }

    #[tokio::test]
    async fn test_new_game_over_tcp() {
        let server = Server::new("127.0.0.1:0", ServerConfig::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        tokio::spawn(server.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_packet(&mut stream, &Packet::NewGame).await.unwrap();

        let match_id = match read_packet(&mut stream).await.unwrap() {
            Some(Packet::Joined { match_id, side }) => {
                assert_eq!(side, Side::Red);
                match_id
            }
            other => panic!("expected Joined, got {:?}", other),
        };
        assert!(registry.contains(match_id));

        write_packet(
            &mut stream,
            &Packet::Input {
                match_id,
                side: Side::Red,
                column: ATTACH_ONLY,
            },
        )
        .await
        .unwrap();
        assert!(matches!(
            read_packet(&mut stream).await.unwrap(),
            Some(Packet::State { .. })
        ));
    }

    #[tokio::test]
    async fn test_garbage_frame_closes_connection() {
        use tokio::io::AsyncWriteExt;

        let server = Server::new("127.0.0.1:0", ServerConfig::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(&[0, 0, 0, 2, 0xFF, 0xFF]).await.unwrap();

        // Server drops the connection, so the next read sees end of stream.
        assert!(matches!(read_packet(&mut stream).await, Ok(None) | Err(_)));
    }
}
