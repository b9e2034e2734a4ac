use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use billflow_core::{Bill, BillId, NewBill};
use billflow_pipeline::{BillPipeline, BillProcessResult, RawImage};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::cors::cors_layer;
use crate::error::ServerError;
use crate::store::BillStore;

/// Multipart field carrying the bill image.
const IMAGE_FIELD: &str = "image";
const FALLBACK_FILENAME: &str = "upload";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: BillPipeline,
    pub store: Arc<BillStore>,
}

impl AppState {
    pub fn new(pipeline: BillPipeline) -> Self {
        Self { pipeline, store: Arc::new(BillStore::new()) }
    }
}

pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/bills", post(create_bill).get(list_bills))
        .route("/api/bills/process", post(process_bill))
        .route("/api/bills/{id}", get(get_bill))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn process_bill(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BillProcessResult>, ServerError> {
    // A request that is not multipart at all carries no image.
    let image = match multipart {
        Ok(multipart) => read_image(multipart).await?,
        Err(_) => None,
    };
    let result = state.pipeline.process(image).await?;
    Ok(Json(result))
}

async fn read_image(mut multipart: Multipart) -> Result<Option<RawImage>, ServerError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|f| !f.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(upload_error)?;
        return Ok(Some(
            RawImage::new(bytes.to_vec(), filename).with_content_type(content_type.as_deref()),
        ));
    }
    Ok(None)
}

fn upload_error(e: axum::extract::multipart::MultipartError) -> ServerError {
    ServerError::Upload { status: e.status(), message: e.body_text() }
}

#[derive(Serialize)]
struct Created {
    message: &'static str,
    id: BillId,
}

async fn create_bill(
    State(state): State<AppState>,
    payload: Result<Json<NewBill>, JsonRejection>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let bill = request.validate()?;
    let id = state.store.insert(bill).await;
    tracing::info!(bill_id = %id, "bill stored");
    Ok((StatusCode::CREATED, Json(Created { message: "Bill created successfully", id })))
}

#[derive(Serialize)]
struct BillList {
    data: Vec<Bill>,
}

async fn list_bills(State(state): State<AppState>) -> Json<BillList> {
    Json(BillList { data: state.store.list().await })
}

async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Bill>, ServerError> {
    let id: u64 = id
        .parse()
        .map_err(|_| ServerError::BadRequest("Invalid ID format".to_string()))?;
    state
        .store
        .get(BillId(id))
        .await
        .map(Json)
        .ok_or_else(|| ServerError::NotFound("Bill not found".to_string()))
}
