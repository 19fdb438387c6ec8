use anyhow::Context;
use clap::{Parser, Subcommand};
use murmur_chats::{MessageStore, RoomProvisioner};
use murmur_config::load as load_config;
use murmur_gateway::GatewayState;
use murmur_runtime::{telemetry, BackendServices};
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "murmur-backend")]
#[command(about = "Murmur chat backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP/WebSocket server (default)
    Serve,
    /// Seed the database with a demo room and messages
    SeedData,
    /// Dump rooms, memberships, messages, and watermarks
    DumpData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::SeedData => seed_data().await,
        Commands::DumpData => dump_data().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Murmur backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = GatewayState::new(
        services.db_pool.clone(),
        config.chat.clone(),
        services.registry.clone(),
    );
    let app = murmur_gateway::create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(murmur_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("seeding database with demo data");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let provisioner = RoomProvisioner::new(services.db_pool.clone(), &config.chat);
    let store = MessageStore::new(services.db_pool.clone(), &config.chat);

    let room = provisioner
        .get_or_create(1, 2)
        .await
        .context("failed to provision demo room")?;

    for (sender, content) in [
        (1, "hey, is this thing on?"),
        (2, "loud and clear"),
        (1, "good - see you at the demo"),
    ] {
        store
            .append(room.id, sender, content)
            .await
            .context("failed to append demo message")?;
    }

    println!("Seeded private room {} for users 1 and 2", room.id);
    println!("Run 'dump-data' to see the inserted data");

    Ok(())
}

async fn dump_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let rooms = sqlx::query("SELECT id, kind, pair_key, created_at FROM rooms ORDER BY id ASC")
        .fetch_all(&services.db_pool)
        .await
        .context("failed to fetch rooms")?;

    println!("=== ROOMS ===");
    if rooms.is_empty() {
        println!("No rooms found in database");
    } else {
        println!(
            "{:<6} {:<10} {:<12} {:<25}",
            "ID", "Kind", "Pair Key", "Created At"
        );
        for room in rooms {
            let id: i64 = room.get("id");
            let kind: String = room.get("kind");
            let pair_key: Option<String> = room.get("pair_key");
            let created_at: String = room.get("created_at");
            println!(
                "{:<6} {:<10} {:<12} {:<25}",
                id,
                kind,
                pair_key.as_deref().unwrap_or("NULL"),
                created_at
            );
        }
    }

    println!("\n=== MEMBERS ===");
    let members =
        sqlx::query("SELECT id, room_id, user_id, joined_at FROM room_members ORDER BY id ASC")
            .fetch_all(&services.db_pool)
            .await
            .context("failed to fetch members")?;

    if members.is_empty() {
        println!("No memberships found in database");
    } else {
        println!(
            "{:<6} {:<8} {:<8} {:<25}",
            "ID", "Room", "User", "Joined At"
        );
        for member in members {
            let id: i64 = member.get("id");
            let room_id: i64 = member.get("room_id");
            let user_id: i64 = member.get("user_id");
            let joined_at: String = member.get("joined_at");
            println!("{id:<6} {room_id:<8} {user_id:<8} {joined_at:<25}");
        }
    }

    println!("\n=== MESSAGES ===");
    let messages = sqlx::query(
        "SELECT id, room_id, sender_id, content, sent_at FROM messages ORDER BY id ASC",
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch messages")?;

    if messages.is_empty() {
        println!("No messages found in database");
    } else {
        println!(
            "{:<6} {:<8} {:<8} {:<50} {:<25}",
            "ID", "Room", "Sender", "Content (truncated)", "Sent At"
        );
        for message in messages {
            let id: i64 = message.get("id");
            let room_id: i64 = message.get("room_id");
            let sender_id: i64 = message.get("sender_id");
            let content: String = message.get("content");
            let sent_at: String = message.get("sent_at");

            let content_display = if content.len() > 47 {
                format!("{}...", &content[..44])
            } else {
                content
            };

            println!("{id:<6} {room_id:<8} {sender_id:<8} {content_display:<50} {sent_at:<25}");
        }
    }

    println!("\n=== READ WATERMARKS ===");
    let watermarks = sqlx::query(
        "SELECT room_id, user_id, last_read_message_id, updated_at
         FROM read_watermarks ORDER BY room_id ASC, user_id ASC",
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch watermarks")?;

    if watermarks.is_empty() {
        println!("No watermarks found in database");
    } else {
        println!(
            "{:<8} {:<8} {:<12} {:<25}",
            "Room", "User", "Last Read", "Updated At"
        );
        for mark in watermarks {
            let room_id: i64 = mark.get("room_id");
            let user_id: i64 = mark.get("user_id");
            let last_read: i64 = mark.get("last_read_message_id");
            let updated_at: String = mark.get("updated_at");
            println!("{room_id:<8} {user_id:<8} {last_read:<12} {updated_at:<25}");
        }
    }

    Ok(())
}
