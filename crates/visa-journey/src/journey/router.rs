use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::domain::{JourneyId, JourneyPhase, JourneyStatus, SharePermission};
use super::repository::JourneyRepository;
use super::service::{JourneyService, JourneyServiceError, StartJourney};
use crate::auth::Caller;
use crate::catalog::{PersonalizationData, VisaCatalog};
use crate::error::ValidationError;

/// Journey endpoints. Every handler needs a [`Caller`], so the router must be
/// served behind a `TokenVerifier` extension.
pub fn journey_router<R, C>(service: Arc<JourneyService<R, C>>) -> Router
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    Router::new()
        .route(
            "/api/v1/journeys",
            post(create_handler::<R, C>).get(list_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id",
            get(get_handler::<R, C>).delete(delete_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id/steps/:step_id",
            put(set_step_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id/steps/:step_id/complete",
            post(complete_step_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id/checklist",
            patch(checklist_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id/personalization",
            patch(personalization_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id/status",
            put(status_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id/notes",
            post(note_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id/share",
            post(share_handler::<R, C>),
        )
        .route(
            "/api/v1/journeys/:journey_id/requirements",
            get(requirements_handler::<R, C>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    status: Option<JourneyStatus>,
}

#[derive(Debug, Deserialize)]
struct StepCompletionBody {
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: JourneyStatus,
    #[serde(default)]
    phase: Option<JourneyPhase>,
}

#[derive(Debug, Deserialize)]
struct NoteBody {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ShareBody {
    email: String,
    #[serde(default)]
    permission: SharePermission,
}

type Service<R, C> = State<Arc<JourneyService<R, C>>>;

/// Axum's rejection is plain text; report it in the usual `{"error": ...}` shape.
type Body = Result<Json<Value>, JsonRejection>;

fn body_value(payload: Body) -> Result<Value, JourneyServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ValidationError::InvalidRequest(rejection.body_text()).into())
}

fn parse_body<T: DeserializeOwned>(payload: Body) -> Result<T, JourneyServiceError> {
    serde_json::from_value(body_value(payload)?)
        .map_err(|err| ValidationError::InvalidRequest(err.to_string()).into())
}

fn journey_response<T: serde::Serialize>(
    result: Result<T, JourneyServiceError>,
    status: StatusCode,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    payload: Body,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    let result = parse_body::<StartJourney>(payload)
        .and_then(|request| service.create_or_resume(&caller, request));
    match result {
        Ok(started) => {
            let status = if started.resumed {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(started.journey)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    journey_response(service.list(&caller, query.status), StatusCode::OK)
}

pub(crate) async fn get_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path(journey_id): Path<String>,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    journey_response(
        service.get(&caller, &JourneyId(journey_id)),
        StatusCode::OK,
    )
}

pub(crate) async fn delete_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path(journey_id): Path<String>,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    match service.delete(&caller, &JourneyId(journey_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn set_step_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path((journey_id, step_id)): Path<(String, String)>,
    payload: Body,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    let id = JourneyId(journey_id);
    let result = parse_body::<StepCompletionBody>(payload).and_then(|body| {
        service.set_step_completion(&caller, &id, &step_id, body.completed)
    });
    journey_response(result, StatusCode::OK)
}

pub(crate) async fn complete_step_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path((journey_id, step_id)): Path<(String, String)>,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    journey_response(
        service.mark_step_completed(&caller, &JourneyId(journey_id), &step_id),
        StatusCode::OK,
    )
}

pub(crate) async fn checklist_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path(journey_id): Path<String>,
    payload: Body,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    let id = JourneyId(journey_id);
    let result = parse_body::<BTreeMap<String, bool>>(payload)
        .and_then(|updates| service.update_checklist(&caller, &id, updates));
    journey_response(result, StatusCode::OK)
}

pub(crate) async fn personalization_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path(journey_id): Path<String>,
    payload: Body,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    let id = JourneyId(journey_id);
    let result = body_value(payload)
        .and_then(|payload| PersonalizationData::from_json(payload).map_err(Into::into))
        .and_then(|partial| service.update_personalization(&caller, &id, partial));
    journey_response(result, StatusCode::OK)
}

pub(crate) async fn status_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path(journey_id): Path<String>,
    payload: Body,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    let id = JourneyId(journey_id);
    let result = parse_body::<StatusBody>(payload)
        .and_then(|body| service.update_status(&caller, &id, body.status, body.phase));
    journey_response(result, StatusCode::OK)
}

pub(crate) async fn note_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path(journey_id): Path<String>,
    payload: Body,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    let id = JourneyId(journey_id);
    let result = parse_body::<NoteBody>(payload)
        .and_then(|body| service.add_note(&caller, &id, &body.content));
    journey_response(result, StatusCode::CREATED)
}

pub(crate) async fn share_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path(journey_id): Path<String>,
    payload: Body,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    let id = JourneyId(journey_id);
    let result = parse_body::<ShareBody>(payload)
        .and_then(|body| service.share(&caller, &id, &body.email, body.permission));
    journey_response(result, StatusCode::OK)
}

pub(crate) async fn requirements_handler<R, C>(
    State(service): Service<R, C>,
    caller: Caller,
    Path(journey_id): Path<String>,
) -> Response
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    journey_response(
        service.requirements(&caller, &JourneyId(journey_id)),
        StatusCode::OK,
    )
}
