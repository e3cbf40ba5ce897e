// ABOUTME: Example follower demonstrating join and drift-corrected tracking
// ABOUTME: Tracks the host timeline on a simulated device

use clap::Parser;
use listenalong::playback::{PlaybackSyncController, SimulatedDevice, SyncConfig};
use listenalong::protocol::RoomClient;

/// listenalong follower
#[derive(Parser, Debug)]
#[command(name = "follower")]
#[command(about = "Join a room and track its timeline", long_about = None)]
struct Args {
    /// WebSocket URL of the room relay
    #[arg(short, long, default_value = "ws://localhost:10000/rooms")]
    server: String,

    /// Identifier of the room to join
    #[arg(short, long)]
    room: String,

    /// Room password, when required
    #[arg(short, long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    println!("Connecting to {}...", args.server);
    let room = match args.password.clone() {
        Some(password) => RoomClient::builder()
            .room_id(args.room.clone())
            .password(password)
            .build(),
        None => RoomClient::builder().room_id(args.room.clone()).build(),
    };
    let client = room.connect(&args.server).await?;
    let (mut inbound, outbound) = client.split();
    println!("Connected! Joining room {}...", args.room);

    let mut controller = PlaybackSyncController::new(outbound, SyncConfig::default());
    controller.attach(Box::new(SimulatedDevice::new(None)));
    controller.begin_join();

    controller.run(&mut inbound).await;

    println!("Disconnected.");
    Ok(())
}
