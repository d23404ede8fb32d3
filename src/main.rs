use fieldlink::signaling::{DEFAULT_PORT, SignalingServer};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let bind_addr = format!("0.0.0.0:{}", port);

    println!("   fieldlink signaling server");
    println!("   Binding to {}", bind_addr);
    println!("   Press Ctrl+C to stop\n");

    let server = SignalingServer::new();
    server.run(&bind_addr).await
}
