//! # Connect-Four Client Library
//!
//! This library provides a desktop client for the Connect-Four server. The
//! server owns all game rules; the client shows the latest board it was sent
//! and turns mouse clicks into column numbers.
//!
//! ## Architecture Overview
//!
//! The render loop runs on the main thread under macroquad. Networking runs on
//! a separate thread with its own tokio runtime, so a slow or stalled server
//! never freezes the window. The two sides exchange [`network::ServerEvent`]s
//! and [`network::UserCommand`]s over bounded channels.
//!
//! ### Session Flow
//! 1. Connect and send `NewGame` or `JoinGame`
//! 2. On `Joined`, send an attach-only `Input` to bind the connection
//! 3. Relay `State` snapshots to the UI and clicks to the server
//! 4. On quit, send `LeaveGame` and close
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Client view of the match: seat, board, turn, score and connection status.
//!
//! ### Input Module (`input`)
//! Board layout geometry, click-to-column mapping and quit keys.
//!
//! ### Network Module (`network`)
//! The network thread and the session protocol.
//!
//! ### Rendering Module (`rendering`)
//! Board, pieces and header text.

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
