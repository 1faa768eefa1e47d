//! # Connect-Four Server Library
//!
//! This library provides the authoritative server for networked Connect-Four
//! on an 8x8 board. It hosts many independent two-player matches, validates
//! every move, and pushes the resulting board to both players.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! The server owns the board of each match. Clients only name a column; the
//! server checks turn order, drops the piece, settles gravity, detects four in
//! a row, keeps the score and resets the board after a win or a full board.
//!
//! ### Match Lifecycle
//! Handles the complete life of a match:
//! - Creation with a fresh random identifier, creator seated as red
//! - Joining by identifier, second player seated as yellow
//! - Leaving, explicitly or by disconnecting
//! - Removal once both seats are free, or after a long idle period
//!
//! ### State Broadcasting
//! After each accepted move the new board, turn and score are sent to both
//! attached players. A slow client never stalls its opponent: when its queue
//! is full the snapshot is dropped and the next one catches it up.
//!
//! ## Module Organization
//!
//! ### Board Module (`board`)
//! Grid storage, piece dropping, gravity and win detection.
//!
//! ### Game Module (`game`)
//! A single match: seats, turn, score and the attached outbound streams.
//!
//! ### Registry Module (`registry`)
//! All live matches keyed by identifier, with race-free removal.
//!
//! ### Protocol Module (`protocol`)
//! Per-connection state machine turning packets into registry calls.
//!
//! ### Network Module (`network`)
//! TCP listener, per-connection reader and writer tasks, idle reaping.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig, ServerError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ServerError> {
//!     let server = Server::new("127.0.0.1:50051", ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod error;
pub mod game;
pub mod network;
pub mod protocol;
pub mod registry;
