//! Import session endpoints: upload an export, run it, watch progress, reset.

use crate::error::ApiError;
use crate::import::{ImportDefaults, ImportService, SessionSnapshot};
use rocket::data::{ByteUnit, Data};
use rocket::response::status::Accepted;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;

/// Reset the session and load a CSV export sent as the raw request body.
#[post("/imports/upload?<file_name>", data = "<body>")]
pub async fn upload_export(
    file_name: &str,
    body: Data<'_>,
    service: &State<ImportService>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let limit = ByteUnit::from(service.config().max_upload_bytes);
    let capped = body
        .open(limit)
        .into_bytes()
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to read upload: {e}")))?;

    if !capped.is_complete() {
        return Err(ApiError::PayloadTooLarge(format!(
            "Upload exceeds the {} byte limit",
            service.config().max_upload_bytes
        )));
    }

    let input = capped.into_inner();
    let worker = service.inner().clone();
    let file_name = file_name.to_string();

    let snapshot = tokio::task::spawn_blocking(move || worker.upload(&file_name, &input))
        .await
        .map_err(|e| {
            let message = format!("Parse task failed: {e}");
            service.abandon_parse(&message);
            ApiError::InternalError(message)
        })??;

    Ok(Json(snapshot))
}

/// Start importing the loaded products with optional publish/discount overrides.
#[openapi(tag = "Imports")]
#[post("/imports/run", data = "<request>")]
pub fn start_import(
    request: Json<ImportDefaults>,
    service: &State<ImportService>,
) -> Result<Accepted<Json<SessionSnapshot>>, ApiError> {
    let snapshot = service.start(request.into_inner())?;
    Ok(Accepted(Json(snapshot)))
}

/// Current progress, counts, preview and failures of the session.
#[openapi(tag = "Imports")]
#[get("/imports/status")]
pub fn import_status(service: &State<ImportService>) -> Json<SessionSnapshot> {
    Json(service.status())
}

/// Clear the session. Rejected while an import is running.
#[openapi(tag = "Imports")]
#[post("/imports/reset")]
pub fn reset_import(service: &State<ImportService>) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(service.reset()?))
}
