use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{CollectDraft, CollectId, PaymentDraft, PaymentId, UserId, UserRegistration};
use super::export::write_payments_csv;
use super::notifications::Notifier;
use super::repository::{CampaignRepository, RepositoryError};
use super::service::{CampaignService, CampaignServiceError};
use super::views::{CollectView, PageView, PaymentView};

/// Header carrying the numeric id of the calling user on write requests.
pub const USER_HEADER: &str = "x-user-id";

const COLLECTS_PATH: &str = "/api/collects/";
const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Router builder exposing the collect and payment endpoints.
pub fn campaign_router<R, N>(service: Arc<CampaignService<R, N>>) -> Router
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    Router::new()
        .route("/api/users/", post(register_handler::<R, N>))
        .route(
            COLLECTS_PATH,
            get(list_collects_handler::<R, N>).post(create_collect_handler::<R, N>),
        )
        .route(
            "/api/collects/:collect_id/",
            get(collect_detail_handler::<R, N>).delete(delete_collect_handler::<R, N>),
        )
        .route(
            "/api/collects/:collect_id/payments/",
            get(collect_payments_handler::<R, N>),
        )
        .route(
            "/api/collects/:collect_id/payments.csv",
            get(collect_payments_csv_handler::<R, N>),
        )
        .route(
            "/api/payments/",
            get(list_payments_handler::<R, N>).post(create_payment_handler::<R, N>),
        )
        .route(
            "/api/payments/:payment_id/",
            delete(delete_payment_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    page: Option<usize>,
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "detail": message.into() }))).into_response()
}

/// Resolve the caller from the identity header; anonymous writes are rejected.
fn caller(headers: &HeaderMap) -> Result<UserId, Response> {
    let raw = headers
        .get(USER_HEADER)
        .ok_or_else(|| {
            detail(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            )
        })?
        .to_str()
        .map_err(|_| detail(StatusCode::UNAUTHORIZED, "Invalid user header."))?;

    raw.trim()
        .parse::<u64>()
        .map(UserId)
        .map_err(|_| detail(StatusCode::UNAUTHORIZED, "Invalid user header."))
}

fn field_errors(field: &str, message: impl Into<String>) -> Response {
    let mut payload = serde_json::Map::new();
    payload.insert(field.to_string(), json!([message.into()]));
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

/// Malformed payloads are reported like validation failures: keyed by the offending
/// field when the decoder names one, under `non_field_errors` otherwise.
pub(crate) fn rejection_response(rejection: JsonRejection) -> Response {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let (field, message) = decode_error_field(&err.body_text());
            field_errors(&field, message)
        }
        other => detail(other.status(), other.body_text()),
    }
}

/// Split a decoder message into the field it names and the message itself. The decoder
/// prefixes the field path (`amount: invalid type ...`) except for missing fields, which
/// it names inline.
fn decode_error_field(text: &str) -> (String, String) {
    let detail = text.split_once(": ").map_or(text, |(_, detail)| detail);
    let detail = detail
        .rsplit_once(" at line ")
        .map_or(detail, |(message, _)| message);

    if let Some(rest) = detail.strip_prefix("missing field `") {
        if let Some((field, _)) = rest.split_once('`') {
            return (field.to_string(), "This field is required.".to_string());
        }
    }
    if let Some((path, message)) = detail.split_once(": ") {
        let field = path.split('.').next().unwrap_or(path);
        let is_identifier = !field.is_empty()
            && field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_identifier {
            return (field.to_string(), message.to_string());
        }
    }
    (NON_FIELD_ERRORS.to_string(), detail.to_string())
}

pub(crate) fn error_response(err: CampaignServiceError) -> Response {
    match err {
        CampaignServiceError::Validation(error) => field_errors(error.field(), error.to_string()),
        CampaignServiceError::UnknownUser(_) => {
            detail(StatusCode::UNAUTHORIZED, "Unknown user.")
        }
        CampaignServiceError::CollectNotFound(_)
        | CampaignServiceError::PaymentNotFound(_)
        | CampaignServiceError::Repository(RepositoryError::NotFound) => {
            detail(StatusCode::NOT_FOUND, "Not found.")
        }
        CampaignServiceError::PageOutOfRange(_) => detail(StatusCode::NOT_FOUND, "Invalid page."),
        CampaignServiceError::Forbidden { .. } => detail(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.",
        ),
        CampaignServiceError::Repository(RepositoryError::Conflict) => {
            detail(StatusCode::CONFLICT, "Record already exists.")
        }
        other => {
            error!(error = %other, "campaign request failed");
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn register_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    payload: Result<axum::Json<UserRegistration>, JsonRejection>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let registration = match payload {
        Ok(axum::Json(registration)) => registration,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.register_user(registration) {
        Ok(user) => (StatusCode::CREATED, axum::Json(user)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_collects_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    Query(query): Query<PageQuery>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let now = Utc::now();
    match service.list_collects(query.page.unwrap_or(1)) {
        Ok(page) => {
            let view = PageView::from_page(page, COLLECTS_PATH, |details| {
                CollectView::from_details(details, now)
            });
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_collect_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    headers: HeaderMap,
    payload: Result<axum::Json<CollectDraft>, JsonRejection>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let author = match caller(&headers) {
        Ok(author) => author,
        Err(response) => return response,
    };
    let draft = match payload {
        Ok(axum::Json(draft)) => draft,
        Err(rejection) => return rejection_response(rejection),
    };

    let now = Utc::now();
    let created = service
        .create_collect(author, draft, now)
        .and_then(|collect| service.get_collect(collect.id));
    match created {
        Ok(details) => {
            let view = CollectView::from_details(details, now);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn collect_detail_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    Path(collect_id): Path<u64>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    match service.get_collect(CollectId(collect_id)) {
        Ok(details) => {
            let view = CollectView::from_details(details, Utc::now());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_collect_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    headers: HeaderMap,
    Path(collect_id): Path<u64>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let actor = match caller(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.delete_collect(actor, CollectId(collect_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn collect_payments_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    Path(collect_id): Path<u64>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    match service.payments_for_collect(CollectId(collect_id)) {
        Ok(payments) => {
            let views: Vec<PaymentView> = payments.into_iter().map(PaymentView::from).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn collect_payments_csv_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    Path(collect_id): Path<u64>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let payments = match service.payments_for_collect(CollectId(collect_id)) {
        Ok(payments) => payments,
        Err(err) => return error_response(err),
    };

    let mut buffer = Vec::new();
    if let Err(err) = write_payments_csv(&payments, &mut buffer) {
        error!(collect_id, error = %err, "payment export failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        buffer,
    )
        .into_response()
}

pub(crate) async fn list_payments_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    match service.list_payments() {
        Ok(payments) => {
            let views: Vec<PaymentView> = payments.into_iter().map(PaymentView::from).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_payment_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    headers: HeaderMap,
    payload: Result<axum::Json<PaymentDraft>, JsonRejection>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let donator = match caller(&headers) {
        Ok(donator) => donator,
        Err(response) => return response,
    };
    let draft = match payload {
        Ok(axum::Json(draft)) => draft,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.make_payment(donator, draft, Utc::now()) {
        Ok(payment) => {
            (StatusCode::CREATED, axum::Json(PaymentView::from(payment))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_payment_handler<R, N>(
    State(service): State<Arc<CampaignService<R, N>>>,
    headers: HeaderMap,
    Path(payment_id): Path<u64>,
) -> Response
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let actor = match caller(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.delete_payment(actor, PaymentId(payment_id), Utc::now()) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}
