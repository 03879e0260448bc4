//! CRUD handlers shared by every resource endpoint.

use crate::api::Collection;
use crate::api::query::{ListPlan, ListQuery, ResourceQuery};
use crate::error::{Result, ServiceError};
use crate::forward::ResourceChange;
use crate::patch::apply_patch;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use scim_types::{Meta, PatchOp, Resource, ResourceType};
use serde_json::{Value, json};
use uuid::Uuid;

const SCIM_CONTENT_TYPE: &str = "application/scim+json";

fn location(resource_type: ResourceType, id: Uuid) -> String {
    format!("/scim/v2/{}/{}", resource_type.endpoint(), id)
}

/// Unknown and malformed ids are both reported as not found.
fn parse_id<T: Resource>(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| ServiceError::NotFound {
        resource_type: T::RESOURCE_TYPE,
        id: id.to_string(),
    })
}

fn body(payload: std::result::Result<Json<Value>, JsonRejection>) -> Result<Value> {
    let Json(value) = payload.map_err(|e| ServiceError::InvalidSyntax(e.body_text()))?;
    if !value.is_object() {
        return Err(ServiceError::InvalidSyntax(
            "Request body must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

fn query_params<Q>(params: std::result::Result<Query<Q>, QueryRejection>) -> Result<Q> {
    params
        .map(|Query(q)| q)
        .map_err(|e| ServiceError::InvalidValue(e.body_text()))
}

fn scim_json(status: StatusCode, value: Value) -> impl IntoResponse {
    (status, [(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)], Json(value))
}

/// Stamps the server-owned `id` and `meta` onto a client document.
fn with_identity(mut value: Value, id: Uuid, meta: &Meta) -> Result<Value> {
    if let Value::Object(map) = &mut value {
        map.insert("id".to_string(), json!(id));
        map.insert("meta".to_string(), serde_json::to_value(meta)?);
    }
    Ok(value)
}

pub async fn list<T: Collection>(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let params = query_params(params)?;
    let plan = ListPlan::new(&params, &state.parser, &state.config.list)?;

    let snapshot = T::store(&state).list().await;
    let resources = snapshot
        .iter()
        .map(|record| record.to_value())
        .collect::<serde_json::Result<Vec<_>>>()?;

    let response = plan.execute(resources)?;
    tracing::debug!(
        "Listed {} of {} {}s",
        response.resources().len(),
        response.total_results,
        T::RESOURCE_TYPE
    );
    Ok(scim_json(StatusCode::OK, serde_json::to_value(response)?))
}

pub async fn get<T: Collection>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: std::result::Result<Query<ResourceQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let projection = query_params(params)?.projection(&state.parser)?;
    let record = T::store(&state).get(parse_id::<T>(&id)?).await?;
    Ok(scim_json(
        StatusCode::OK,
        projection.apply(record.to_value()?),
    ))
}

pub async fn create<T: Collection>(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id = Uuid::new_v4();
    let location = location(T::RESOURCE_TYPE, id);
    let meta = Meta::new(T::RESOURCE_TYPE, location.clone());

    let record = T::from_value(with_identity(body(payload)?, id, &meta)?)?;
    let record = T::store(&state).create(record).await?;
    let value = record.to_value()?;
    tracing::info!("Created {} {}", T::RESOURCE_TYPE, id);

    state
        .propagate(ResourceChange::add(T::RESOURCE_TYPE, id, value.clone()))
        .await;

    Ok((
        [(header::LOCATION, location)],
        scim_json(StatusCode::CREATED, value),
    ))
}

pub async fn replace<T: Collection>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id = parse_id::<T>(&id)?;
    let document = body(payload)?;
    if let Some(given) = document.get("id") {
        let given = given.as_str().and_then(|s| Uuid::parse_str(s).ok());
        if given != Some(id) {
            return Err(ServiceError::Mutability(
                "Attribute 'id' cannot be changed".to_string(),
            ));
        }
    }

    let record = T::store(&state)
        .modify(
            id,
            Box::new(move |existing: T| -> Result<T> {
                let mut record = T::from_value(with_identity(document, id, existing.meta())?)?;
                record.meta_mut().touch();
                Ok(record)
            }),
        )
        .await?;
    let value = record.to_value()?;
    tracing::info!("Replaced {} {}", T::RESOURCE_TYPE, id);

    state
        .propagate(ResourceChange::replace(T::RESOURCE_TYPE, id, value.clone()))
        .await;
    Ok(scim_json(StatusCode::OK, value))
}

pub async fn patch<T: Collection>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id = parse_id::<T>(&id)?;
    let patch: PatchOp = serde_json::from_value(body(payload)?)
        .map_err(|e| ServiceError::InvalidSyntax(format!("Invalid PatchOp: {}", e)))?;

    let operations = patch.operations.len();
    let parser = state.parser;

    let record = T::store(&state)
        .modify(
            id,
            Box::new(move |existing: T| -> Result<T> {
                let mut document = existing.to_value()?;
                apply_patch(&mut document, &patch, &parser)?;
                let mut record = T::from_value(document)?;
                record.meta_mut().touch();
                Ok(record)
            }),
        )
        .await?;
    let value = record.to_value()?;
    tracing::info!(
        "Patched {} {} ({} operations)",
        T::RESOURCE_TYPE,
        id,
        operations
    );

    state
        .propagate(ResourceChange::replace(T::RESOURCE_TYPE, id, value.clone()))
        .await;
    Ok(scim_json(StatusCode::OK, value))
}

pub async fn delete<T: Collection>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id::<T>(&id)?;
    T::store(&state).delete(id).await?;
    tracing::info!("Deleted {} {}", T::RESOURCE_TYPE, id);

    state
        .propagate(ResourceChange::remove(T::RESOURCE_TYPE, id))
        .await;
    Ok(StatusCode::NO_CONTENT)
}
