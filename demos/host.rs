// ABOUTME: Example host demonstrating room creation and snapshot broadcasting
// ABOUTME: Drives a simulated device so the room has a moving timeline

use clap::Parser;
use listenalong::playback::{PlaybackDevice, PlaybackSyncController, SimulatedDevice, SyncConfig};
use listenalong::protocol::RoomClient;

/// listenalong host
#[derive(Parser, Debug)]
#[command(name = "host")]
#[command(about = "Create a room and host a synchronized timeline", long_about = None)]
struct Args {
    /// WebSocket URL of the room relay
    #[arg(short, long, default_value = "ws://localhost:10000/rooms")]
    server: String,

    /// Optional room password
    #[arg(short, long)]
    password: Option<String>,

    /// Simulated media duration in seconds
    #[arg(short, long, default_value_t = 240.0)]
    duration: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    println!("Connecting to {}...", args.server);
    let room = match args.password.clone() {
        Some(password) => RoomClient::builder().password(password).build(),
        None => RoomClient::builder().build(),
    };
    let client = room.connect(&args.server).await?;
    let (mut inbound, outbound) = client.split();
    println!("Connected! Creating room...");

    let mut device = SimulatedDevice::new(Some(args.duration));
    device.play()?;

    let mut controller = PlaybackSyncController::new(outbound, SyncConfig::default());
    controller.attach(Box::new(device));
    controller.begin_join();

    controller.run(&mut inbound).await;

    println!("Disconnected.");
    Ok(())
}
