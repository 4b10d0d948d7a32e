//! Web server exposing the warp session as a JSON API

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, WarpSettings};
use crate::detect::{decode_image, detect, Detection, PixelBuffer};
use crate::error::WarpError;
use crate::points::{PointId, WarpPoint};
use crate::presets::{find_preset, presets, BodyShapePreset};
use crate::session::{DepthLevel, WarpCommand, WarpSession};
use crate::terrain_mesh::{Hsl, TerrainMesh};
use crate::transform::{Anchor, Footprint, OverlayPlacement, TransformMode, WarpTransform};
use crate::triangulation::{triangle_count, Triangle};

/// Largest accepted image upload for auto-detection
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    /// Configuration as loaded from disk
    config: RwLock<Config>,
    /// Path to save configuration
    config_path: PathBuf,
    /// The live point set; each request swaps in a new one under the write lock
    session: RwLock<WarpSession>,
}

impl AppState {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        let session = WarpSession::new(config.warp.clone(), config.mesh);
        Self {
            config: RwLock::new(config),
            config_path,
            session: RwLock::new(session),
        }
    }

    /// Apply a command to the live session
    pub fn apply(&self, command: &WarpCommand) -> std::result::Result<Vec<WarpPoint>, WarpError> {
        let mut session = self.session.write();
        session.apply(command).map(|set| set.points().to_vec())
    }

    /// Save current warp settings to the config file
    pub fn save_config(&self) -> Result<()> {
        let settings = self.session.read().settings().clone();
        let mut config = self.config.write();
        config.warp = settings;
        config.save(&self.config_path)
    }
}

impl IntoResponse for WarpError {
    fn into_response(self) -> Response {
        let status = match &self {
            WarpError::UnknownPoint(_) | WarpError::UnknownPreset(_) => StatusCode::NOT_FOUND,
            WarpError::PointLocked(_) => StatusCode::CONFLICT,
            WarpError::PixelBuffer { .. } | WarpError::Image(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Point editing
        .route("/api/points", get(get_points).post(add_point))
        .route("/api/points/clear", post(clear_points))
        .route("/api/points/:id", post(update_point).delete(delete_point))
        .route("/api/points/:id/depth/:level", post(quick_depth))
        .route("/api/command", post(run_command))
        // Presets and detection
        .route("/api/presets", get(get_presets))
        .route("/api/presets/:id/apply", post(apply_preset))
        .route(
            "/api/detect",
            post(detect_points).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Derived geometry
        .route("/api/mesh", get(get_mesh))
        .route("/api/triangles", get(get_triangles))
        .route("/api/transform", post(get_transform))
        // Settings
        .route("/api/settings", get(get_settings).post(update_settings))
        .route("/api/settings/save", post(save_settings))
        .route("/api/info", get(get_info))
        .layer(cors)
        .with_state(state)
}

/// Run the web server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// A point as the UI sees it, with its marker color
#[derive(Serialize)]
struct PointView {
    #[serde(flatten)]
    point: WarpPoint,
    color: Hsl,
}

#[derive(Serialize)]
struct PointsResponse {
    points: Vec<PointView>,
    settings: WarpSettings,
}

fn points_response(session: &WarpSession) -> PointsResponse {
    let points = session
        .points()
        .points()
        .iter()
        .map(|p| PointView {
            point: *p,
            color: session.marker_color(p.z),
        })
        .collect();

    PointsResponse {
        points,
        settings: session.settings().clone(),
    }
}

/// Get current points and settings
async fn get_points(State(state): State<Arc<AppState>>) -> Json<PointsResponse> {
    Json(points_response(&state.session.read()))
}

#[derive(Deserialize)]
struct AddPointRequest {
    x: f64,
    y: f64,
    #[serde(default)]
    z: Option<f64>,
}

#[derive(Serialize)]
struct AddPointResponse {
    id: PointId,
}

/// Add a new warp point
async fn add_point(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddPointRequest>,
) -> Json<AddPointResponse> {
    let id = state.session.write().add_point(req.x, req.y, req.z);
    Json(AddPointResponse { id })
}

/// Partial update of one point; absent fields stay as they are
#[derive(Deserialize)]
struct PointUpdate {
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    z: Option<f64>,
    #[serde(default)]
    locked: Option<bool>,
}

/// Update a single warp point
async fn update_point(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(update): Json<PointUpdate>,
) -> Result<Json<WarpPoint>, WarpError> {
    let id = PointId(id);
    let mut session = state.session.write();
    let current = *session.points().get(id).ok_or(WarpError::UnknownPoint(id))?;

    // Unlock first so a single request can unlock and move
    if let Some(false) = update.locked {
        session.apply(&WarpCommand::SetLocked { id, locked: false })?;
    }
    if update.x.is_some() || update.y.is_some() {
        session.apply(&WarpCommand::Move {
            id,
            x: update.x.unwrap_or(current.x),
            y: update.y.unwrap_or(current.y),
        })?;
    }
    if let Some(z) = update.z {
        session.apply(&WarpCommand::SetDepth { id, z })?;
    }
    if let Some(true) = update.locked {
        session.apply(&WarpCommand::SetLocked { id, locked: true })?;
    }

    let point = *session.points().get(id).ok_or(WarpError::UnknownPoint(id))?;
    Ok(Json(point))
}

/// Delete a warp point
async fn delete_point(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, WarpError> {
    state.apply(&WarpCommand::Remove { id: PointId(id) })?;
    Ok(StatusCode::OK)
}

/// Snap a point to one of the quick depth levels
async fn quick_depth(
    State(state): State<Arc<AppState>>,
    Path((id, level)): Path<(u64, String)>,
) -> Response {
    let Some(level) = DepthLevel::parse(&level) else {
        return (StatusCode::BAD_REQUEST, format!("unknown depth level '{}'", level)).into_response();
    };
    match state.apply(&WarpCommand::QuickDepth { id: PointId(id), level }) {
        Ok(points) => Json(points).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Remove all points
async fn clear_points(State(state): State<Arc<AppState>>) -> Result<StatusCode, WarpError> {
    state.apply(&WarpCommand::Clear)?;
    Ok(StatusCode::OK)
}

/// Apply an arbitrary command
async fn run_command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<WarpCommand>,
) -> Result<Json<Vec<WarpPoint>>, WarpError> {
    Ok(Json(state.apply(&command)?))
}

/// List the body shape presets
async fn get_presets() -> Json<&'static [BodyShapePreset]> {
    Json(presets())
}

/// Replace the points with a preset
async fn apply_preset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WarpPoint>>, WarpError> {
    let preset = find_preset(&id).ok_or_else(|| WarpError::UnknownPreset(id.clone()))?;
    tracing::info!("Applying body shape preset '{}'", preset.name);
    Ok(Json(state.apply(&WarpCommand::ApplyPreset { preset: id })?))
}

#[derive(Deserialize)]
struct DetectQuery {
    #[serde(default)]
    max_points: Option<usize>,
}

/// Decode an uploaded photo, detect points and install them
async fn detect_points(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DetectQuery>,
    body: Bytes,
) -> Response {
    let result = tokio::task::spawn_blocking(move || -> std::result::Result<Detection, WarpError> {
        let image = decode_image(&body)?;
        let pixels = PixelBuffer::from_image(&image);
        tracing::info!("Detecting warp points in {}x{} image", pixels.width(), pixels.height());
        // Detection runs unlocked; only the swap takes the write lock
        let options = state.session.read().detect_options(query.max_points);
        let detection = detect(&pixels, &options);
        state.session.write().install_detection(&detection)?;
        Ok(detection)
    })
    .await;

    match result {
        Ok(Ok(detection)) => Json(detection).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            tracing::error!("Detection task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[derive(Deserialize)]
struct MeshQuery {
    #[serde(default)]
    grid_size: Option<usize>,
}

#[derive(Serialize)]
struct MeshResponse {
    #[serde(flatten)]
    mesh: TerrainMesh,
    rows: Vec<Vec<usize>>,
    columns: Vec<Vec<usize>>,
}

/// Get the terrain mesh visualization
async fn get_mesh(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MeshQuery>,
) -> Json<MeshResponse> {
    let mesh = state.session.read().terrain_mesh(query.grid_size);
    Json(MeshResponse {
        rows: mesh.row_lines(),
        columns: mesh.column_lines(),
        mesh,
    })
}

/// Get the current triangulation
async fn get_triangles(State(state): State<Arc<AppState>>) -> Json<Vec<Triangle>> {
    Json(state.session.read().triangles())
}

#[derive(Deserialize)]
struct TransformRequest {
    anchor: Anchor,
    #[serde(default)]
    footprint: Option<Footprint>,
    /// Base placement to compose the warp onto
    #[serde(default)]
    base: Option<OverlayPlacement>,
}

#[derive(Serialize)]
struct TransformResponse {
    mode: TransformMode,
    transform: WarpTransform,
    #[serde(skip_serializing_if = "Option::is_none")]
    placement: Option<OverlayPlacement>,
}

/// Compute the overlay warp for an anchor position
async fn get_transform(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransformRequest>,
) -> Json<TransformResponse> {
    let session = state.session.read();
    let transform = session.overlay_transform(req.anchor, req.footprint);

    Json(TransformResponse {
        mode: session.settings().mode,
        transform,
        placement: req.base.map(|base| transform.compose(base)),
    })
}

/// Get warp settings
async fn get_settings(State(state): State<Arc<AppState>>) -> Json<WarpSettings> {
    Json(state.session.read().settings().clone())
}

/// Partial settings update
#[derive(Deserialize)]
struct SettingsUpdate {
    #[serde(default)]
    strength: Option<f64>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    mode: Option<TransformMode>,
    #[serde(default)]
    footprint: Option<Footprint>,
    #[serde(default)]
    mesh_grid_size: Option<usize>,
    #[serde(default)]
    detect_max_points: Option<usize>,
    #[serde(default)]
    edge_threshold: Option<f64>,
}

/// Update warp settings
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Json<WarpSettings> {
    let mut session = state.session.write();
    let mut settings = session.settings().clone();

    if let Some(v) = update.strength {
        settings.strength = v;
    }
    if let Some(v) = update.enabled {
        settings.enabled = v;
    }
    if let Some(v) = update.mode {
        settings.mode = v;
    }
    if let Some(v) = update.footprint {
        settings.footprint = v;
    }
    if let Some(v) = update.mesh_grid_size {
        settings.mesh_grid_size = v;
    }
    if let Some(v) = update.detect_max_points {
        settings.detect_max_points = v;
    }
    if let Some(v) = update.edge_threshold {
        settings.edge_threshold = v;
    }

    session.set_settings(settings);
    Json(session.settings().clone())
}

/// Save settings to file
async fn save_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.save_config() {
        Ok(_) => (StatusCode::OK, "Saved").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// System information response
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    points: usize,
    triangles: usize,
    mode: TransformMode,
    warping_enabled: bool,
}

/// Get system information
async fn get_info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let session = state.session.read();
    let n = session.points().len();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        points: n,
        triangles: triangle_count(n),
        mode: session.settings().mode,
        warping_enabled: session.settings().enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = Arc::new(AppState::new(Config::default(), PathBuf::from("unused.toml")));
        router(state)
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_add_and_list_points() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/points", serde_json::json!({"x": 0.4, "y": 1.7})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = body_json(response).await["id"].as_u64().unwrap();

        let response = app
            .oneshot(Request::get("/api/points").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        let points = json["points"].as_array().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0]["id"].as_u64().unwrap(), id);
        assert_eq!(points[0]["y"].as_f64().unwrap(), 1.0);
        assert_eq!(points[0]["z"].as_f64().unwrap(), 0.5);
        assert!(points[0]["color"]["hue"].is_number());
    }

    #[tokio::test]
    async fn test_locked_point_conflict() {
        let app = app();
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/points", serde_json::json!({"x": 0.1, "y": 0.1})))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_u64().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/points/{}", id),
                serde_json::json!({"locked": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/points/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(Request::delete("/api/points/999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_apply_preset_and_mesh() {
        let app = app();
        let response = app
            .clone()
            .oneshot(Request::post("/api/presets/shoulder/apply").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 6);

        let response = app
            .clone()
            .oneshot(Request::get("/api/mesh?grid_size=4").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["samples"].as_array().unwrap().len(), 16);
        assert_eq!(json["rows"].as_array().unwrap().len(), 4);

        let response = app
            .oneshot(Request::post("/api/presets/tail/apply").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transform_identity_without_points() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/transform",
                serde_json::json!({"anchor": {"x": 0.5, "y": 0.5}}),
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["mode"], "terrain");
        assert_eq!(json["transform"]["scale_x"].as_f64().unwrap(), 1.0);
        assert_eq!(json["transform"]["skew_x"].as_f64().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_detect_rejects_garbage() {
        let response = app()
            .oneshot(Request::post("/api/detect").body(Body::from("nope")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_detect_installs_points() {
        let image = image::RgbaImage::from_pixel(32, 24, image::Rgba([128, 128, 128, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut png, image::ImageOutputFormat::Png)
            .unwrap();

        let state = Arc::new(AppState::new(Config::default(), PathBuf::from("unused.toml")));
        let response = router(state.clone())
            .oneshot(
                Request::post("/api/detect?max_points=4")
                    .body(Body::from(png.into_inner()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["strategy"], "grid");
        assert_eq!(json["points"].as_array().unwrap().len(), 4);
        assert_eq!(state.session.read().points().len(), 4);
    }

    #[tokio::test]
    async fn test_mesh_grid_size_is_capped() {
        let response = app()
            .oneshot(
                Request::get("/api/mesh?grid_size=100000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["grid_size"], 256);
    }

    #[tokio::test]
    async fn test_settings_update_clamps() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/settings",
                serde_json::json!({"strength": 140.0, "mode": "triangle"}),
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["strength"].as_f64().unwrap(), 100.0);
        assert_eq!(json["mode"], "triangle");
    }
}
