//! JSON handlers for the room-facing HTTP API
//!
//! Thin shell over `ArenaManager`: request decoding and status mapping
//! only, every domain check lives below.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::Reply;

use crate::core::arena::SharedArenaManager;
use crate::error::OrbArenaError;

#[derive(Debug, Deserialize)]
pub struct RegisterPlayerRequest {
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub balance: f64,
}

#[derive(Debug, Deserialize)]
pub struct WalletConnectRequest {
    pub user_id: i64,
    pub wallet_address: String,
}

#[derive(Debug, Deserialize)]
pub struct DonationRequest {
    pub user_id: i64,
    pub amount: f64,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WagerRequest {
    pub user_id: i64,
    pub username: String,
    pub wager: f64,
}

#[derive(Debug, Deserialize)]
pub struct EndGameRequest {
    pub room_id: String,
    #[serde(default)]
    pub winner_id: Option<i64>,
    /// Per-player orb counts, keyed by player id
    #[serde(default)]
    pub results: HashMap<i64, f64>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_reply(e: OrbArenaError) -> warp::reply::Response {
    let status = e.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!("Request failed: {}", e);
    }
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            error: e.to_string(),
        }),
        status,
    )
    .into_response()
}

fn json_reply<T: Serialize>(value: &T) -> warp::reply::Response {
    warp::reply::json(value).into_response()
}

pub async fn register_player(
    req: RegisterPlayerRequest,
    arena: SharedArenaManager,
) -> Result<impl Reply, Infallible> {
    match arena
        .register_player(req.user_id, req.username, req.wallet_address, req.balance)
        .await
    {
        Ok(player) => Ok(json_reply(&player)),
        Err(e) => Ok(error_reply(e)),
    }
}

pub async fn get_player(
    user_id: i64,
    arena: SharedArenaManager,
) -> Result<impl Reply, Infallible> {
    match arena.get_player(user_id).await {
        Ok(player) => Ok(json_reply(&player)),
        Err(e) => Ok(error_reply(e)),
    }
}

pub async fn connect_wallet(
    req: WalletConnectRequest,
    arena: SharedArenaManager,
) -> Result<impl Reply, Infallible> {
    match arena.connect_wallet(req.user_id, req.wallet_address).await {
        Ok(()) => Ok(json_reply(&serde_json::json!({ "status": "success" }))),
        Err(e) => Ok(error_reply(e)),
    }
}

pub async fn add_donation(
    req: DonationRequest,
    arena: SharedArenaManager,
) -> Result<impl Reply, Infallible> {
    match arena
        .add_donation(req.user_id, req.amount, req.transaction_hash)
        .await
    {
        Ok(balance) => Ok(json_reply(&serde_json::json!({
            "status": "success",
            "balance": balance,
        }))),
        Err(e) => Ok(error_reply(e)),
    }
}

pub async fn create_room(
    req: WagerRequest,
    arena: SharedArenaManager,
) -> Result<impl Reply, Infallible> {
    match arena.create_room(req.user_id, req.username, req.wager).await {
        Ok(room) => Ok(json_reply(&room)),
        Err(e) => Ok(error_reply(e)),
    }
}

pub async fn list_rooms(arena: SharedArenaManager) -> Result<impl Reply, Infallible> {
    let rooms = arena.list_rooms().await;
    Ok(json_reply(&serde_json::json!({ "rooms": rooms })))
}

pub async fn join_room(
    room_id: String,
    req: WagerRequest,
    arena: SharedArenaManager,
) -> Result<impl Reply, Infallible> {
    match arena
        .join_room(&room_id, req.user_id, req.username, req.wager)
        .await
    {
        Ok(room) => Ok(json_reply(&room)),
        Err(e) => Ok(error_reply(e)),
    }
}

pub async fn end_game(
    req: EndGameRequest,
    arena: SharedArenaManager,
) -> Result<impl Reply, Infallible> {
    match arena
        .settle_room(&req.room_id, req.winner_id, &req.results)
        .await
    {
        Ok(report) => Ok(json_reply(&report)),
        Err(e) => Ok(error_reply(e)),
    }
}
