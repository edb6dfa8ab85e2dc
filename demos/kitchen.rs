use std::time::Duration;
use tracing_subscriber::EnvFilter;
use yakiniku_realtime::{
    AppNamespace, Event, RealtimeConfig, RealtimeConnection, RealtimeEvent,
};

#[derive(Debug, serde::Deserialize)]
struct OrderItem {
    name: String,
    #[serde(default = "one")]
    quantity: u32,
}

#[derive(Debug, serde::Deserialize)]
struct NewOrder {
    #[serde(default)]
    table_number: Option<String>,
    #[serde(default)]
    items: Vec<OrderItem>,
}

fn one() -> u32 {
    1
}

/// Kitchen display feed with a keepalive ping
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let mut config = RealtimeConfig::from_env()?;
    if config.namespace == AppNamespace::Dashboard && std::env::var("REALTIME_APP").is_err() {
        // from_env defaults to the dashboard; this demo is the kitchen display
        config = RealtimeConfig {
            namespace: AppNamespace::Kitchen,
            reconnect: AppNamespace::Kitchen.default_policy(),
            ..config
        };
    }
    if config.heartbeat_interval().is_none() {
        config = config.with_heartbeat(Duration::from_secs(25));
    }

    let conn = RealtimeConnection::new(config)?;

    conn.on(RealtimeEvent::NewOrder, |event: &Event| {
        match event.data_as::<NewOrder>() {
            Ok(order) => {
                println!(
                    "🔥 New order for table {}",
                    order.table_number.as_deref().unwrap_or("?")
                );
                for item in order.items {
                    println!("   {} × {}", item.quantity, item.name);
                }
            }
            Err(e) => println!("🔥 New order (unrecognised payload: {}): {}", e, event.data),
        }
    });
    conn.on(RealtimeEvent::ItemUpdate, |event: &Event| {
        println!("🍖 Item update: {}", event.data);
    });
    conn.on(RealtimeEvent::OrderUpdate, |event: &Event| {
        println!("📋 Order update: {}", event.data);
    });
    conn.on(RealtimeEvent::ConfigUpdate, |event: &Event| {
        println!("⚙️  Config update: {}", event.data);
    });
    conn.on(RealtimeEvent::Failed, |_: &Event| {
        println!("❌ Kitchen display offline. Restart to retry.");
    });

    conn.connect().await;
    println!("Kitchen display running on branch '{}'", conn.branch_code().await);

    tokio::signal::ctrl_c().await?;

    println!("Disconnecting...");
    conn.disconnect().await;
    println!("Disconnected!");

    Ok(())
}
