use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::auth::{self, AuthUser};
use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::error::ExchangeError;
use crate::oracle::SUPPORTED_ASSETS;
use crate::types::{Position, User};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// User as returned to clients: everything but the password hash and the
/// store version.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub balance: Decimal,
    pub portfolio: Vec<Position>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            balance: user.balance,
            portfolio: user.portfolio.clone(),
            created_at: user.created_at,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(ExchangeError::InvalidRequest("a valid email is required".to_string()).into());
    }
    if req.password.len() < 6 {
        return Err(ExchangeError::InvalidRequest(
            "password must be at least 6 characters".to_string(),
        )
        .into());
    }
    if name.is_empty() {
        return Err(ExchangeError::InvalidRequest("name is required".to_string()).into());
    }

    let password_hash =
        auth::hash_password(&req.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let user = User::new(email, name, password_hash, state.starting_balance);
    state.store.insert_user(&user).await?;

    let token = auth::create_token(&state.jwt_secret, user.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": UserProfile::from(&user) })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::create_token(&state.jwt_secret, user.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(
        json!({ "token": token, "user": UserProfile::from(&user) }),
    ))
}

pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .load_user(auth_user.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(json!({ "user": UserProfile::from(&user) })))
}

pub async fn buy(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<Value>, ApiError> {
    let receipt = state
        .executor
        .buy(auth_user.user_id, &req.symbol, req.amount)
        .await?;
    Ok(Json(json!({
        "message": "Purchase successful",
        "transaction": receipt.transaction,
        "user": UserProfile::from(&receipt.user),
    })))
}

pub async fn sell(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<Value>, ApiError> {
    let receipt = state
        .executor
        .sell(auth_user.user_id, &req.symbol, req.amount)
        .await?;
    Ok(Json(json!({
        "message": "Sale successful",
        "transaction": receipt.transaction,
        "user": UserProfile::from(&receipt.user),
    })))
}

pub async fn transactions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);
    let (transactions, total) = state
        .executor
        .transactions(auth_user.user_id, Some(limit), Some(offset))
        .await?;
    Ok(Json(json!({
        "transactions": transactions,
        "total": total,
        "limit": limit,
        "offset": offset,
    })))
}

pub async fn all_prices(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let quotes = state.oracle.get_all_prices().await?;
    let prices: serde_json::Map<String, Value> = quotes
        .into_iter()
        .map(|q| (q.symbol.clone(), json!(q)))
        .collect();
    Ok(Json(json!({ "prices": prices })))
}

pub async fn price(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let quote = state.oracle.get_price(&symbol).await.map_err(|err| match err {
        ExchangeError::UnsupportedAsset(_) => {
            ApiError::NotFound("cryptocurrency not found".to_string())
        }
        other => other.into(),
    })?;
    Ok(Json(json!({ "price": quote })))
}

pub async fn supported() -> Json<Value> {
    Json(json!({ "cryptocurrencies": SUPPORTED_ASSETS }))
}
