// Copyright 2026 Boundless Foundation, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Read-only HTTP API over the public points ledger.

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use points_ledger::db::{points as points_db, Db};
use serde::Deserialize;

#[derive(Clone)]
struct ApiState {
    db: Db,
}

struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("api error: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    100
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/v1/leaderboard", get(leaderboard))
        .route("/v1/points/:address", get(points_for_address))
        .with_state(ApiState { db })
}

pub async fn serve(db: Db, listen: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    tracing::info!("serving leaderboard API on {listen}");
    axum::serve(listener, router(db)).await?;
    Ok(())
}

async fn leaderboard(
    State(state): State<ApiState>,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<points_db::LeaderboardEntry>>, ApiError> {
    let entries = points_db::leaderboard(
        state.db.pool(),
        page.limit.clamp(1, 1000),
        page.offset.max(0),
    )
    .await?;
    Ok(Json(entries))
}

async fn points_for_address(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<points_db::PublicRow>>, ApiError> {
    let rows = points_db::rows_for_address(state.db.pool(), &address).await?;
    Ok(Json(rows))
}
