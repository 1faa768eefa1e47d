mod game;
mod input;
mod network;
mod rendering;

use clap::{ArgGroup, Parser};
use game::ClientGameState;
use input::{BoardLayout, InputManager};
use log::info;
use macroquad::prelude::*;
use network::{NetworkHandle, StartMode, UserCommand};
use rendering::Renderer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["new", "join_id"])))]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:50051")]
    server: String,

    /// Create a new match and play red
    #[arg(short = 'n', long)]
    new: bool,

    /// Join an existing match and play yellow
    #[arg(short = 'j', long)]
    join_id: Option<u32>,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Connect Four".to_owned(),
        window_width: 800,
        window_height: 600,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let mode = match args.join_id {
        Some(match_id) => StartMode::Join(match_id),
        None => StartMode::New,
    };

    info!("Connecting to: {}", args.server);
    info!("Controls: click a column to drop, Q to quit");

    let mut network = NetworkHandle::spawn(args.server, mode);
    let mut state = ClientGameState::new();
    let mut input_manager = InputManager::new();
    let renderer = Renderer::new();

    loop {
        while let Some(event) = network.try_recv() {
            state.apply_event(event);
        }

        let layout = BoardLayout::fit(screen_width(), screen_height());

        match input_manager.update(&layout) {
            Some(UserCommand::Quit) => break,
            Some(command) if state.is_playing() => network.send(command),
            _ => {}
        }

        renderer.render(&state, &layout);
        next_frame().await;
    }

    network.shutdown();
}
