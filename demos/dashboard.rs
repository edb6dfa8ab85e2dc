use tracing_subscriber::EnvFilter;
use yakiniku_realtime::types::channels;
use yakiniku_realtime::{Event, RealtimeConfig, RealtimeConnection, RealtimeEvent};

/// Dashboard feed: bookings and table status for one branch
///
/// Reads `REALTIME_*` variables (a `.env` file works too), e.g.
/// `REALTIME_WS_URL=ws://localhost:8000/ws REALTIME_BRANCH=hirama cargo run --example dashboard`
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RealtimeConfig::from_env()?;
    println!(
        "📡 Dashboard for branch '{}' via {}\n",
        config.branch_code,
        config.endpoint_url(&config.branch_code)?
    );

    let conn = RealtimeConnection::new(config)?;

    conn.on(RealtimeEvent::Connected, |event: &Event| {
        println!("✅ Connected: {}", event.data);
    });
    conn.on(RealtimeEvent::Disconnected, |event: &Event| {
        println!("⚠️  Disconnected: {}", event.data);
    });
    conn.on(RealtimeEvent::Failed, |event: &Event| {
        println!("❌ Realtime offline after {} attempts", event.data["attempts"]);
    });
    conn.on(RealtimeEvent::Subscribed, |event: &Event| {
        println!("📬 Subscribed to {}", event.data["channel"]);
    });

    conn.on_channel(channels::BOOKINGS, RealtimeEvent::BookingCreated, |event: &Event| {
        println!("🆕 Booking created: {}", event.data);
    });
    conn.on_channel(channels::BOOKINGS, RealtimeEvent::BookingUpdated, |event: &Event| {
        println!("✏️  Booking updated: {}", event.data);
    });
    conn.on(RealtimeEvent::TableStatus, |event: &Event| {
        println!(
            "🍽️  Table {} is now {}",
            event.data["table_id"], event.data["status"]
        );
    });
    conn.on(RealtimeEvent::Notification, |event: &Event| {
        println!("🔔 {}", event.data);
    });

    conn.subscribe(channels::BOOKINGS).await;
    conn.subscribe(channels::TABLES).await;
    conn.connect().await;

    // Print state transitions until Ctrl+C
    let mut states = conn.state_changes();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            println!("   state: {}", state);
        }
    });

    tokio::signal::ctrl_c().await?;

    println!("Disconnecting...");
    conn.disconnect().await;
    println!("Disconnected!");

    Ok(())
}
