use crate::catalog::store::StoreStatus;
use crate::catalog::{CatalogError, with_deadline};
use crate::AppState;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use carview_model::{FilterOptions, Metadata, Vehicle, VehicleId, ViewHistory};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Name of the cookie holding the view history
pub const HISTORY_COOKIE: &str = "viewed_cars";
const HISTORY_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;
const DEFAULT_RANDOM_LIMIT: usize = 4;
/// Most vehicles shown side by side on the compare page
pub const MAX_COMPARED: usize = 3;

pub fn create_app(state: AppState) -> Router {
    let routes = Router::new()
        .route("/api/cars", get(handle_list_cars))
        .route("/api/cars/random", get(handle_random_cars))
        .route("/api/cars/{id}", get(handle_get_car))
        .route("/api/compare", get(handle_compare))
        .route("/api/recommendations", get(handle_recommendations))
        .route("/api/metadata", get(handle_metadata))
        .route("/healthz", get(handle_health))
        .with_state(state);
    with_middleware(routes)
}

/// Request id, tracing, panic recovery and CORS around every route.
///
/// The request id is set outermost so the trace span and the response
/// both carry it; a panicking handler becomes a 500 inside the span.
pub(crate) fn with_middleware(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CatchPanicLayer::new())
            .layer(CorsLayer::permissive()),
    )
}

/// Catalog failure rendered as an HTTP error
#[derive(Debug)]
pub struct ApiError(CatalogError);

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };

        if status == StatusCode::NOT_FOUND {
            debug!("{}", self.0);
        } else {
            error!("❌ Catalog request failed: {}", self.0);
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

async fn handle_list_cars(
    State(state): State<AppState>,
    Query(filter): Query<FilterOptions>,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    debug!("Listing cars with {:?}", filter);
    let vehicles = with_deadline(state.request_timeout, state.catalog.vehicles(&filter)).await?;
    Ok(Json(vehicles))
}

#[derive(Debug, Deserialize)]
struct RandomParams {
    limit: Option<usize>,
}

async fn handle_random_cars(
    State(state): State<AppState>,
    Query(params): Query<RandomParams>,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_RANDOM_LIMIT);
    let vehicles = with_deadline(state.request_timeout, state.catalog.random(limit)).await?;
    Ok(Json(vehicles))
}

#[derive(Debug, Serialize)]
struct CarPage {
    car: Vehicle,
    recommendations: Vec<Vehicle>,
}

async fn handle_get_car(
    State(state): State<AppState>,
    Path(id): Path<VehicleId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let car = with_deadline(state.request_timeout, state.catalog.vehicle(id)).await?;

    let history = history_from_headers(&headers).track(id);
    let recommendations = state.recommender.recommend(&history, Some(id)).await;
    info!("🚗 Viewed car {} ({} in history)", id, history.len());

    let mut response = Json(CarPage { car, recommendations }).into_response();
    match HeaderValue::from_str(&history_cookie(&history)) {
        Ok(cookie) => {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        Err(e) => warn!("Could not encode history cookie: {}", e),
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct CompareParams {
    ids: Option<String>,
}

#[derive(Debug, Serialize)]
struct ComparePage {
    cars: Vec<Vehicle>,
    /// Accepted ids, comma separated, for building remove links
    ids: String,
    max_horsepower: u32,
    newest_year: u32,
}

/// Positive ids from a comma separated list, first occurrence wins,
/// at most [`MAX_COMPARED`] of them. Anything unparseable is ignored.
pub fn parse_compare_ids(raw: &str) -> Vec<VehicleId> {
    let mut ids = Vec::with_capacity(MAX_COMPARED);
    for id in raw.split(',').filter_map(|part| part.trim().parse::<VehicleId>().ok()) {
        if id == 0 || ids.contains(&id) {
            continue;
        }
        ids.push(id);
        if ids.len() == MAX_COMPARED {
            break;
        }
    }
    ids
}

async fn handle_compare(State(state): State<AppState>, Query(params): Query<CompareParams>) -> Json<ComparePage> {
    let ids = parse_compare_ids(params.ids.as_deref().unwrap_or_default());

    let mut cars = Vec::with_capacity(ids.len());
    for &id in &ids {
        match with_deadline(state.request_timeout, state.catalog.vehicle(id)).await {
            Ok(car) => cars.push(car),
            Err(e) => warn!("Skipping car {} in comparison: {}", id, e),
        }
    }

    let max_horsepower = cars.iter().map(|car| car.specification.horsepower).max().unwrap_or(0);
    let newest_year = cars.iter().map(|car| car.year).max().unwrap_or(0);
    debug!("Comparing {} of {} requested cars", cars.len(), ids.len());

    Json(ComparePage {
        cars,
        ids: ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(","),
        max_horsepower,
        newest_year,
    })
}

#[derive(Debug, Deserialize)]
struct RecommendationParams {
    exclude: Option<VehicleId>,
}

async fn handle_recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationParams>,
    headers: HeaderMap,
) -> Json<Vec<Vehicle>> {
    let history = history_from_headers(&headers);
    Json(state.recommender.recommend(&history, params.exclude).await)
}

async fn handle_metadata(State(state): State<AppState>) -> Result<Json<Metadata>, ApiError> {
    let metadata = with_deadline(state.request_timeout, state.catalog.metadata()).await?;
    Ok(Json(metadata))
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<StoreStatus>,
}

async fn handle_health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        backend: state.catalog.backend().to_string(),
        snapshot: state.store.as_ref().map(|store| store.status()),
    })
}

/// View history carried by the request's `viewed_cars` cookie
pub fn history_from_headers(headers: &HeaderMap) -> ViewHistory {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == HISTORY_COOKIE)
        .map(|(_, value)| ViewHistory::parse(value.trim_matches('"')))
        .unwrap_or_default()
}

/// `Set-Cookie` value persisting `history`
pub fn history_cookie(history: &ViewHistory) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        HISTORY_COOKIE,
        history.encode(),
        HISTORY_MAX_AGE_SECS
    )
}
