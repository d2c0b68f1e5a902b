use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::answers::PersonalizationData;
use super::domain::{VisaTypeKey, VisaTypeSummary};
use super::personalize::{personalize_visa_type, validate_answers};
use super::repository::{CatalogError, VisaCatalog};
use crate::error::ValidationError;

/// Public reference-data endpoints; no caller identity required.
pub fn catalog_router<C>(catalog: Arc<C>) -> Router
where
    C: VisaCatalog + 'static,
{
    Router::new()
        .route(
            "/api/v1/visa-types/:origin/:destination",
            get(list_handler::<C>),
        )
        .route(
            "/api/v1/visa-types/:origin/:destination/:code",
            get(detail_handler::<C>),
        )
        .route(
            "/api/v1/visa-types/:origin/:destination/:code/personalize",
            post(personalize_handler::<C>),
        )
        .with_state(catalog)
}

pub(crate) async fn list_handler<C>(
    State(catalog): State<Arc<C>>,
    Path((origin, destination)): Path<(String, String)>,
) -> Response
where
    C: VisaCatalog + 'static,
{
    match catalog.visa_types_for_route(&origin, &destination) {
        Ok(visa_types) => {
            let summaries: Vec<VisaTypeSummary> =
                visa_types.iter().map(|visa_type| visa_type.summary()).collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn detail_handler<C>(
    State(catalog): State<Arc<C>>,
    Path((origin, destination, code)): Path<(String, String, String)>,
) -> Response
where
    C: VisaCatalog + 'static,
{
    let key = VisaTypeKey::new(&origin, &destination, &code);
    match catalog.visa_type(&key) {
        Ok(Some(visa_type)) => (StatusCode::OK, Json(visa_type)).into_response(),
        Ok(None) => catalog_error_response(CatalogError::NotFound(key)),
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn personalize_handler<C>(
    State(catalog): State<Arc<C>>,
    Path((origin, destination, code)): Path<(String, String, String)>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response
where
    C: VisaCatalog + 'static,
{
    let key = VisaTypeKey::new(&origin, &destination, &code);
    let visa_type = match catalog.visa_type(&key) {
        Ok(Some(visa_type)) => visa_type,
        Ok(None) => return catalog_error_response(CatalogError::NotFound(key)),
        Err(err) => return catalog_error_response(err),
    };

    let answers = match payload
        .map_err(|rejection| ValidationError::InvalidRequest(rejection.body_text()))
        .and_then(|Json(payload)| PersonalizationData::from_json(payload))
        .and_then(|answers| validate_answers(&visa_type, &answers).map(|_| answers))
    {
        Ok(answers) => answers,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };

    let requirements = personalize_visa_type(&visa_type, &answers);
    (StatusCode::OK, Json(requirements)).into_response()
}

fn catalog_error_response(err: CatalogError) -> Response {
    match err {
        CatalogError::NotFound(_) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        CatalogError::Unavailable(_) => {
            error!(error = %err, "visa catalog request failed");
            let payload = json!({ "error": "internal server error" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
