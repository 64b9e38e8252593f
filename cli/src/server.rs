use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::error;

use stride_core::db::Database;
use stride_core::models::{ActivityRecord, ActivityType, FoodItem, MealType, UserGoals, UserProfile};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Database>>,
    api_key: Option<String>,
}

impl AppState {
    fn db(&self) -> std::sync::MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct FoodItemsQuery {
    user_id: String,
    favorite: Option<bool>,
    meal_type: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
}

#[derive(Deserialize)]
struct ActivityRecordsQuery {
    user_id: String,
    activity_type: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn parse_millis(field: &str, millis: i64) -> Result<DateTime<Utc>, ApiError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ApiError::BadRequest(format!("{field} timestamp out of range: {millis}")))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Food item handlers ---

async fn list_food_items(
    State(state): State<AppState>,
    Query(query): Query<FoodItemsQuery>,
) -> Result<Json<Vec<FoodItem>>, ApiError> {
    let db = state.db();

    if query.favorite == Some(true) {
        let items = db
            .favorite_food_items(&query.user_id)
            .context("database error")?;
        return Ok(Json(items));
    }

    if let Some(ref meal) = query.meal_type {
        let meal_type =
            MealType::from_str(meal).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
        let (Some(start), Some(end)) = (query.start, query.end) else {
            return Err(ApiError::BadRequest(
                "meal_type filter requires start and end".to_string(),
            ));
        };
        let items = db
            .food_items_by_meal_type(
                &query.user_id,
                meal_type,
                parse_millis("start", start)?,
                parse_millis("end", end)?,
            )
            .context("database error")?;
        return Ok(Json(items));
    }

    if query.start.is_some() || query.end.is_some() {
        let (Some(start), Some(end)) = (query.start, query.end) else {
            return Err(ApiError::BadRequest(
                "date range requires both start and end".to_string(),
            ));
        };
        let items = db
            .food_items_by_date_range(
                &query.user_id,
                parse_millis("start", start)?,
                parse_millis("end", end)?,
            )
            .context("database error")?;
        return Ok(Json(items));
    }

    let items = db
        .food_items_for_user(&query.user_id)
        .context("database error")?;
    Ok(Json(items))
}

async fn get_food_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FoodItem>, ApiError> {
    let item = state.db().get_food_item(&id).context("database error")?;
    item.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No food item with id '{id}'")))
}

async fn put_food_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut item): Json<FoodItem>,
) -> Result<Json<FoodItem>, ApiError> {
    if item.id.is_empty() {
        item.id = id.clone();
    } else if item.id != id {
        return Err(ApiError::BadRequest(format!(
            "Document id '{}' does not match path id '{id}'",
            item.id
        )));
    }
    state.db().upsert_food_item(&item).context("database error")?;
    Ok(Json(item))
}

async fn delete_food_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.db().delete_food_item(&id).context("database error")?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No food item with id '{id}'")))
    }
}

// --- Activity record handlers ---

async fn list_activity_records(
    State(state): State<AppState>,
    Query(query): Query<ActivityRecordsQuery>,
) -> Result<Json<Vec<ActivityRecord>>, ApiError> {
    let db = state.db();

    if let Some(ref activity) = query.activity_type {
        let activity_type =
            ActivityType::from_str(activity).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
        let records = db
            .activity_records_by_type(&query.user_id, activity_type)
            .context("database error")?;
        return Ok(Json(records));
    }

    if query.start.is_some() || query.end.is_some() {
        let (Some(start), Some(end)) = (query.start, query.end) else {
            return Err(ApiError::BadRequest(
                "date range requires both start and end".to_string(),
            ));
        };
        let records = db
            .activity_records_by_date_range(
                &query.user_id,
                parse_millis("start", start)?,
                parse_millis("end", end)?,
            )
            .context("database error")?;
        return Ok(Json(records));
    }

    let records = db
        .activity_records_for_user(&query.user_id)
        .context("database error")?;
    Ok(Json(records))
}

async fn get_activity_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActivityRecord>, ApiError> {
    let record = state
        .db()
        .get_activity_record(&id)
        .context("database error")?;
    record
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No activity record with id '{id}'")))
}

async fn put_activity_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut record): Json<ActivityRecord>,
) -> Result<Json<ActivityRecord>, ApiError> {
    if record.id.is_empty() {
        record.id = id.clone();
    } else if record.id != id {
        return Err(ApiError::BadRequest(format!(
            "Document id '{}' does not match path id '{id}'",
            record.id
        )));
    }
    state
        .db()
        .upsert_activity_record(&record)
        .context("database error")?;
    Ok(Json(record))
}

async fn delete_activity_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .db()
        .delete_activity_record(&id)
        .context("database error")?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "No activity record with id '{id}'"
        )))
    }
}

// --- User goals / profile handlers ---

async fn get_user_goals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserGoals>, ApiError> {
    let goals = state.db().get_user_goals(&user_id).context("database error")?;
    goals
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No goals for user '{user_id}'")))
}

async fn put_user_goals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(mut goals): Json<UserGoals>,
) -> Result<Json<UserGoals>, ApiError> {
    if goals.user_id.is_empty() {
        goals.user_id = user_id.clone();
    } else if goals.user_id != user_id {
        return Err(ApiError::BadRequest(format!(
            "Document user_id '{}' does not match path '{user_id}'",
            goals.user_id
        )));
    }
    state.db().upsert_user_goals(&goals).context("database error")?;
    Ok(Json(goals))
}

async fn get_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .db()
        .get_user_profile(&user_id)
        .context("database error")?;
    profile
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No profile for user '{user_id}'")))
}

async fn put_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(mut profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, ApiError> {
    if profile.user_id.is_empty() {
        profile.user_id = user_id.clone();
    } else if profile.user_id != user_id {
        return Err(ApiError::BadRequest(format!(
            "Document user_id '{}' does not match path '{user_id}'",
            profile.user_id
        )));
    }
    state
        .db()
        .upsert_user_profile(&profile)
        .context("database error")?;
    Ok(Json(profile))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/food_items", get(list_food_items))
        .route(
            "/api/food_items/{id}",
            get(get_food_item)
                .put(put_food_item)
                .delete(delete_food_item),
        )
        .route("/api/activity_records", get(list_activity_records))
        .route(
            "/api/activity_records/{id}",
            get(get_activity_record)
                .put(put_activity_record)
                .delete(delete_activity_record),
        )
        .route(
            "/api/user_goals/{user_id}",
            get(get_user_goals).put(put_user_goals),
        )
        .route(
            "/api/user_profiles/{user_id}",
            get(get_user_profile).put(put_user_profile),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    db: Database,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(api_key: Option<String>) -> Router {
        build_router(AppState {
            db: Arc::new(Mutex::new(Database::open_in_memory().unwrap())),
            api_key,
        })
    }

    fn sample_food(id: &str, user: &str) -> FoodItem {
        FoodItem {
            id: id.to_string(),
            user_id: user.to_string(),
            name: "Granola".to_string(),
            brand: None,
            calories: 450,
            protein: 10.0,
            carbs: 60.0,
            fat: 18.0,
            serving_size: 50.0,
            serving_unit: "g".to_string(),
            is_favorite: false,
            consumption_count: 0,
            meal_type: MealType::Breakfast,
            date: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            date_added: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            is_public: false,
        }
    }

    async fn put_json(app: &Router, path: &str, body: &impl Serialize) -> Response {
        app.clone()
            .oneshot(
                axum::http::Request::put(path)
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn get(app: &Router, path: &str) -> Response {
        app.clone()
            .oneshot(axum::http::Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = get(&app, "/api/food_items?user_id=u1").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/food_items?user_id=u1")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/food_items?user_id=u1")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_auth_mode_allows_requests() {
        let app = test_app(None);
        let response = get(&app, "/api/food_items?user_id=u1").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(None);
        let response = get(&app, "/api/food_items?user_id=u1").await;

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app(None);

        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::put("/api/food_items/f1")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn food_item_put_get_roundtrip() {
        let app = test_app(None);
        let item = sample_food("f1", "u1");

        let response = put_json(&app, "/api/food_items/f1", &item).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(&app, "/api/food_items/f1").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["name"], "Granola");
        assert_eq!(json["meal_type"], "BREAKFAST");
        assert_eq!(json["date"], 1_700_000_000_000_i64);
    }

    #[tokio::test]
    async fn food_item_empty_body_id_takes_path_id() {
        let app = test_app(None);
        let item = sample_food("", "u1");

        let response = put_json(&app, "/api/food_items/assigned-id", &item).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["id"], "assigned-id");

        let response = get(&app, "/api/food_items/assigned-id").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn food_item_id_mismatch_rejected() {
        let app = test_app(None);
        let item = sample_food("other-id", "u1");

        let response = put_json(&app, "/api/food_items/f1", &item).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn food_item_get_missing_returns_404() {
        let app = test_app(None);
        let response = get(&app, "/api/food_items/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn food_item_delete() {
        let app = test_app(None);
        put_json(&app, "/api/food_items/f1", &sample_food("f1", "u1")).await;

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::delete("/api/food_items/f1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                axum::http::Request::delete("/api/food_items/f1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn food_items_list_filters() {
        let app = test_app(None);
        let mut fav = sample_food("fav", "u1");
        fav.is_favorite = true;
        put_json(&app, "/api/food_items/fav", &fav).await;

        let mut lunch = sample_food("lunch", "u1");
        lunch.meal_type = MealType::Lunch;
        put_json(&app, "/api/food_items/lunch", &lunch).await;

        put_json(&app, "/api/food_items/other", &sample_food("other", "u2")).await;

        let json = body_json(get(&app, "/api/food_items?user_id=u1").await).await;
        assert_eq!(json.as_array().unwrap().len(), 2);

        let json = body_json(get(&app, "/api/food_items?user_id=u1&favorite=true").await).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["id"], "fav");

        let json = body_json(
            get(
                &app,
                "/api/food_items?user_id=u1&meal_type=LUNCH&start=0&end=1800000000000",
            )
            .await,
        )
        .await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["id"], "lunch");
    }

    #[tokio::test]
    async fn food_items_range_requires_both_bounds() {
        let app = test_app(None);
        let response = get(&app, "/api/food_items?user_id=u1&start=0").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn food_items_bad_meal_type_rejected() {
        let app = test_app(None);
        let response =
            get(&app, "/api/food_items?user_id=u1&meal_type=BRUNCH&start=0&end=1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn activity_record_roundtrip_and_type_filter() {
        let app = test_app(None);
        let record = ActivityRecord {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            name: "Laps".to_string(),
            activity_type: ActivityType::Swimming,
            duration_minutes: 40,
            calories_burned: 320,
            date: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            distance_km: Some(1.5),
            steps: None,
        };

        let response = put_json(&app, "/api/activity_records/a1", &record).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(
            get(&app, "/api/activity_records?user_id=u1&activity_type=SWIMMING").await,
        )
        .await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["activity_type"], "SWIMMING");

        let json =
            body_json(get(&app, "/api/activity_records?user_id=u1&activity_type=YOGA").await)
                .await;
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_goals_roundtrip() {
        let app = test_app(None);

        let response = get(&app, "/api/user_goals/u1").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let goals = UserGoals::defaults_for("u1");
        let response = put_json(&app, "/api/user_goals/u1", &goals).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(get(&app, "/api/user_goals/u1").await).await;
        assert_eq!(json["daily_calorie_target"], 2000);
        assert_eq!(json["weight_goal_type"], "MAINTAIN");
    }

    #[tokio::test]
    async fn user_profile_roundtrip() {
        let app = test_app(None);
        let profile = UserProfile {
            user_id: String::new(),
            name: "Jo".to_string(),
            email: "jo@example.com".to_string(),
            age: None,
            gender: None,
            height_cm: None,
            activity_level: stride_core::models::ActivityLevel::Moderate,
            join_date: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        };

        // Empty body user_id is filled from the path.
        let response = put_json(&app, "/api/user_profiles/u1", &profile).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(get(&app, "/api/user_profiles/u1").await).await;
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["activity_level"], "MODERATE");
    }

    #[tokio::test]
    async fn user_goals_id_mismatch_rejected() {
        let app = test_app(None);
        let goals = UserGoals::defaults_for("someone-else");
        let response = put_json(&app, "/api/user_goals/u1", &goals).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
