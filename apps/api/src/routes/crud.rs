//! Generic record handlers, instantiated per entity in the router.
//!
//! | Method | Path             | Status |
//! |--------|------------------|--------|
//! | POST   | /v1/<entity>     | 201    |
//! | GET    | /v1/<entity>/{id}| 200    |
//! | GET    | /v1/<entity>     | 200    |
//! | PUT    | /v1/<entity>/{id}| 202    |
//! | DELETE | /v1/<entity>/{id}| 204    |

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use market_core::Validate;
use market_db::store::{Changeset, NewRecord};
use market_db::Record;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cache::cache_key;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::response::Envelope;
use crate::routes::list_params;
use crate::AppState;

pub async fn create<E, C>(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<C>,
) -> ApiResult<Envelope<E>>
where
    E: Record + Serialize,
    C: NewRecord<Target = E> + Validate + DeserializeOwned + Send + Sync + 'static,
{
    req.validate()?;
    let record = state.within(state.db.store::<E>().create(&req)).await?;
    Ok(Envelope::created(record))
}

pub async fn get<E>(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Envelope<E>>
where
    E: Record + Serialize,
{
    let record = state.within(state.db.store::<E>().get_by_id(&id)).await?;
    Ok(Envelope::ok(record))
}

/// One page as `{count, items}`, served from the list cache when fresh.
pub async fn list<E>(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> ApiResult<Envelope<Value>>
where
    E: Record + Serialize,
{
    let query = query.unwrap_or_default();
    let params = list_params::<E>(&query)?;
    let key = cache_key(E::TABLE, &query);

    if let Some(page) = state.cache.lookup(&key).await {
        return Ok(Envelope::ok(page));
    }

    let page = state.within(state.db.store::<E>().get_list(&params)).await?;
    let page = serde_json::to_value(&page)
        .map_err(|e| ApiError::Internal(format!("Failed to encode {} page: {e}", E::ENTITY)))?;

    state.cache.remember(&key, &page, state.list_cache_ttl()).await;
    Ok(Envelope::ok(page))
}

pub async fn update<E, U>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<U>,
) -> ApiResult<Envelope<E>>
where
    E: Record + Serialize,
    U: Changeset<Target = E> + Validate + DeserializeOwned + Send + Sync + 'static,
{
    req.validate()?;
    let record = state.within(state.db.store::<E>().update(&id, &req)).await?;
    Ok(Envelope::accepted(record))
}

pub async fn delete<E>(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode>
where
    E: Record,
{
    state.within(state.db.store::<E>().delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
