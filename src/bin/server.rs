use log::{error, info, warn};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{self, Filter};

use orb_arena::config::ServerConfig;
use orb_arena::core::arena::{ArenaManager, SharedArenaManager};
use orb_arena::handlers::api;
use orb_arena::handlers::websocket::handle_ws_client;
use orb_arena::storage::memory::MemoryAccountStore;

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("No .env file loaded: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load config from the environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, payout_scale={}",
        config.host, config.port, config.payout_scale
    );

    // Build the arena over the in-memory account store
    let store = Arc::new(MemoryAccountStore::new());
    let arena: SharedArenaManager = Arc::new(ArenaManager::with_payout_scale(
        store,
        config.payout_scale,
    ));

    // Player account routes
    let register_player = warp::path!("api" / "player" / "register")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_arena(arena.clone()))
        .and_then(api::register_player);

    let get_player = warp::path!("api" / "player" / i64)
        .and(warp::get())
        .and(with_arena(arena.clone()))
        .and_then(api::get_player);

    let connect_wallet = warp::path!("api" / "wallet" / "connect")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_arena(arena.clone()))
        .and_then(api::connect_wallet);

    let add_donation = warp::path!("api" / "donation" / "add")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_arena(arena.clone()))
        .and_then(api::add_donation);

    // Room lifecycle routes
    let create_room = warp::path!("api" / "game" / "create-room")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_arena(arena.clone()))
        .and_then(api::create_room);

    let list_rooms = warp::path!("api" / "game" / "rooms")
        .and(warp::get())
        .and(with_arena(arena.clone()))
        .and_then(api::list_rooms);

    let join_room = warp::path!("api" / "game" / "join" / String)
        .and(warp::post())
        .and(warp::body::json())
        .and(with_arena(arena.clone()))
        .and_then(api::join_room);

    let end_game = warp::path!("api" / "game" / "end")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_arena(arena.clone()))
        .and_then(api::end_game);

    // Real-time game channel
    let ws_route = warp::path!("ws" / "game" / String / i64)
        .and(warp::ws())
        .and(with_arena(arena.clone()))
        .map(|room_id: String, user_id: i64, ws: warp::ws::Ws, arena| {
            ws.on_upgrade(move |socket| handle_ws_client(socket, room_id, user_id, arena))
        });

    // Health check route
    let health_route = warp::path("health").map(|| "OK");

    let routes = register_player
        .or(get_player)
        .or(connect_wallet)
        .or(add_donation)
        .or(create_room)
        .or(list_rooms)
        .or(join_room)
        .or(end_game)
        .or(ws_route)
        .or(health_route)
        .with(warp::log("orb_arena"));

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Orb Arena server on {}", addr);

    // Graceful shutdown on ctrl-c; in-flight requests (settlements
    // included) run to completion before the listener closes
    let (_, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        if tokio::signal::ctrl_c().await.is_err() {
            error!("Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received, draining connections");
    });

    server.await;
}

// Helper function to include the arena state in requests
fn with_arena(
    arena: SharedArenaManager,
) -> impl Filter<Extract = (SharedArenaManager,), Error = Infallible> + Clone {
    warp::any().map(move || arena.clone())
}
