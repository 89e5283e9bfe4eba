// path_player/src/http_server.rs - Control API over the shared viewer session
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

use crate::animation::SurfaceKind;
use crate::error_handling::PlaybackError;
use crate::frame_driver::SharedSession;
use crate::types::EventSummary;

// ============= Request/Response Models =============

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SurfaceRequest {
    pub surface: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpeedRequest {
    pub multiplier: f64,
}

#[derive(Debug, Serialize)]
pub struct EventEntry {
    #[serde(flatten)]
    pub summary: EventSummary,
    pub label: String,
}

// ============= Custom Error Handling =============

#[derive(Debug)]
struct ServiceError {
    message: String,
    status_code: StatusCode,
}

impl warp::reject::Reject for ServiceError {}

impl ServiceError {
    fn bad_request(message: impl Into<String>) -> Rejection {
        warp::reject::custom(ServiceError {
            message: message.into(),
            status_code: StatusCode::BAD_REQUEST,
        })
    }

    fn payload_too_large(length: u64, limit: u64) -> Rejection {
        warp::reject::custom(ServiceError {
            message: format!("Request body of {length} bytes exceeds the {limit} byte limit"),
            status_code: StatusCode::PAYLOAD_TOO_LARGE,
        })
    }
}

impl From<PlaybackError> for ServiceError {
    fn from(err: PlaybackError) -> Self {
        let status_code = match &err {
            PlaybackError::NoData { .. } | PlaybackError::MissingEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlaybackError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            PlaybackError::Surface(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        log::warn!("Playback request rejected: {}", err);
        ServiceError { message: err.user_notice(), status_code }
    }
}

fn playback_rejection(err: PlaybackError) -> Rejection {
    warp::reject::custom(ServiceError::from(err))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found";
    } else if let Some(service_err) = err.find::<ServiceError>() {
        code = service_err.status_code;
        message = &service_err.message;
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "Malformed request body";
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed";
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large";
    } else {
        log::error!("unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error";
    }

    let json = warp::reply::json(&serde_json::json!({
        "error": message,
        "status_code": code.as_u16(),
    }));

    Ok(warp::reply::with_status(json, code))
}

fn with_cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["Accept", "Accept-Language", "Content-Type", "X-Requested-With"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .max_age(3600)
}

// ============= Middleware & Filters =============

const MAX_BODY_BYTES: u64 = 64 * 1024;

fn with_session(session: SharedSession) -> impl Filter<Extract = (SharedSession,), Error = Infallible> + Clone {
    warp::any().map(move || session.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Like `content_length_limit`, but a missing Content-Length passes
fn optional_length_limit(limit: u64) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(move |length: Option<u64>| async move {
            match length {
                Some(length) if length > limit => Err(ServiceError::payload_too_large(length, limit)),
                _ => Ok(()),
            }
        })
        .untuple_one()
}

/// JSON body that may be absent entirely (no Content-Length required)
fn optional_json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Default + Send,
{
    optional_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(|bytes: Bytes| async move {
            if bytes.len() as u64 > MAX_BODY_BYTES {
                return Err(ServiceError::payload_too_large(bytes.len() as u64, MAX_BODY_BYTES));
            }
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(T::default());
            }
            serde_json::from_slice(&bytes).map_err(|e| ServiceError::bad_request(format!("Malformed request body: {e}")))
        })
}

// ============= Request Handlers =============

async fn handle_health(session: SharedSession) -> Result<impl Reply, Rejection> {
    let session_id = session.lock().await.id();
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "event-path-player",
        "version": env!("CARGO_PKG_VERSION"),
        "session_id": session_id,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn handle_events(session: SharedSession) -> Result<impl Reply, Rejection> {
    let events: Vec<EventEntry> = session
        .lock()
        .await
        .events()
        .into_iter()
        .map(|summary| EventEntry { label: summary.label(), summary })
        .collect();
    Ok(warp::reply::json(&events))
}

async fn handle_state(session: SharedSession) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&session.lock().await.snapshot()))
}

async fn handle_select(request: SelectRequest, session: SharedSession) -> Result<impl Reply, Rejection> {
    let mut session = session.lock().await;
    session.select_event(request.event_id.as_deref());
    Ok(warp::reply::json(&session.snapshot()))
}

async fn handle_surface(request: SurfaceRequest, session: SharedSession) -> Result<impl Reply, Rejection> {
    let kind: SurfaceKind = request
        .surface
        .parse()
        .map_err(|e: String| playback_rejection(PlaybackError::InvalidParameters(e)))?;
    let mut session = session.lock().await;
    session.switch_surface(kind);
    Ok(warp::reply::json(&session.snapshot()))
}

async fn handle_start(request: StartRequest, session: SharedSession) -> Result<impl Reply, Rejection> {
    let mut session = session.lock().await;
    let event_id = request
        .event_id
        .or_else(|| session.selected_event().map(str::to_string))
        .ok_or_else(|| ServiceError::bad_request("No event selected"))?;

    session.start_playback(&event_id).map_err(playback_rejection)?;
    Ok(warp::reply::json(&session.snapshot()))
}

#[derive(Debug, Clone, Copy)]
enum Control {
    Pause,
    Resume,
    Stop,
}

async fn handle_control(control: Control, session: SharedSession) -> Result<impl Reply, Rejection> {
    let mut session = session.lock().await;
    let changed = match control {
        Control::Pause => session.pause(),
        Control::Resume => session.resume(),
        Control::Stop => session.stop(),
    };
    if !changed {
        log::debug!("{:?} ignored in phase {:?}", control, session.phase());
    }
    Ok(warp::reply::json(&serde_json::json!({
        "changed": changed,
        "state": session.snapshot(),
    })))
}

async fn handle_speed(request: SpeedRequest, session: SharedSession) -> Result<impl Reply, Rejection> {
    let mut session = session.lock().await;
    session
        .set_speed_multiplier(request.multiplier)
        .map_err(playback_rejection)?;
    Ok(warp::reply::json(&session.snapshot()))
}

async fn handle_tool(engage: bool, session: SharedSession) -> Result<impl Reply, Rejection> {
    let mut session = session.lock().await;
    if engage {
        session.engage_manual_tool();
    } else {
        session.disengage_manual_tool();
    }
    Ok(warp::reply::json(&session.snapshot()))
}

// ============= Routes =============

pub fn routes(session: SharedSession) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(session.clone()))
        .and_then(handle_health);

    let events = warp::path("events")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(session.clone()))
        .and_then(handle_events);

    let state = warp::path("state")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(session.clone()))
        .and_then(handle_state);

    let select = warp::path("select")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body::<SelectRequest>())
        .and(with_session(session.clone()))
        .and_then(handle_select);

    let surface = warp::path("surface")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body::<SurfaceRequest>())
        .and(with_session(session.clone()))
        .and_then(handle_surface);

    let start = warp::path!("playback" / "start")
        .and(warp::post())
        .and(optional_json_body::<StartRequest>())
        .and(with_session(session.clone()))
        .and_then(handle_start);

    let pause = warp::path!("playback" / "pause")
        .and(warp::post())
        .map(|| Control::Pause)
        .and(with_session(session.clone()))
        .and_then(handle_control);

    let resume = warp::path!("playback" / "resume")
        .and(warp::post())
        .map(|| Control::Resume)
        .and(with_session(session.clone()))
        .and_then(handle_control);

    let stop = warp::path!("playback" / "stop")
        .and(warp::post())
        .map(|| Control::Stop)
        .and(with_session(session.clone()))
        .and_then(handle_control);

    let speed = warp::path!("playback" / "speed")
        .and(warp::post())
        .and(json_body::<SpeedRequest>())
        .and(with_session(session.clone()))
        .and_then(handle_speed);

    let engage = warp::path!("tool" / "engage")
        .and(warp::post())
        .map(|| true)
        .and(with_session(session.clone()))
        .and_then(handle_tool);

    let disengage = warp::path!("tool" / "disengage")
        .and(warp::post())
        .map(|| false)
        .and(with_session(session))
        .and_then(handle_tool);

    health
        .or(events)
        .or(state)
        .or(select)
        .or(surface)
        .or(start)
        .or(pause)
        .or(resume)
        .or(stop)
        .or(speed)
        .or(engage)
        .or(disengage)
        .recover(handle_rejection)
        .with(with_cors())
        .with(warp::log("event_path_player"))
}

// ============= Server Initialization =============

pub async fn start_server(session: SharedSession, port: u16) -> anyhow::Result<()> {
    log::info!("Starting playback control server on port {}", port);
    let addr = ([0, 0, 0, 0], port);
    warp::serve(routes(session)).run(addr).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{ManualClock, ViewerSession};
    use crate::config::PlayerConfig;
    use crate::frame_driver::shared;
    use crate::types::EventLocationRecord;
    use std::sync::Arc;

    fn session() -> (SharedSession, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0.0));
        let records = vec![
            EventLocationRecord::new("a", 0.0, 0.0).with_sequence(0),
            EventLocationRecord::new("a", 0.0, 1.0).with_sequence(1),
            EventLocationRecord::new("solo", 5.0, 5.0),
        ];
        let session = ViewerSession::builder(PlayerConfig::default())
            .clock(clock.clone())
            .records(records)
            .build();
        (shared(session), clock)
    }

    fn body(resp: &warp::http::Response<Bytes>) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_events() {
        let (session, _) = session();
        let api = routes(session);

        let resp = warp::test::request().method("GET").path("/health").reply(&api).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp)["status"], "healthy");

        let resp = warp::test::request().method("GET").path("/events").reply(&api).await;
        let events = body(&resp);
        assert_eq!(events.as_array().map(Vec::len), Some(2));
        assert_eq!(events[0]["eventId"], "a");
        assert_eq!(events[0]["label"], "Unknown Event - no-time (2 locations)");
    }

    #[tokio::test]
    async fn test_playback_lifecycle() {
        let (session, clock) = session();
        let api = routes(session);

        let resp = warp::test::request()
            .method("POST")
            .path("/playback/start")
            .json(&serde_json::json!({"eventId": "a"}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp)["phase"], "Running");

        clock.advance(100.0);
        let resp = warp::test::request().method("POST").path("/playback/pause").reply(&api).await;
        assert_eq!(body(&resp)["changed"], true);
        assert_eq!(body(&resp)["state"]["controls"]["resume"], true);

        let resp = warp::test::request().method("POST").path("/playback/pause").reply(&api).await;
        assert_eq!(body(&resp)["changed"], false);

        let resp = warp::test::request().method("POST").path("/playback/stop").reply(&api).await;
        assert_eq!(body(&resp)["state"]["phase"], "Idle");
    }

    #[tokio::test]
    async fn test_start_uses_selection_when_body_is_empty() {
        let (session, _) = session();
        let api = routes(session);

        let resp = warp::test::request().method("POST").path("/playback/start").reply(&api).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        warp::test::request()
            .method("POST")
            .path("/select")
            .json(&serde_json::json!({"eventId": "a"}))
            .reply(&api)
            .await;
        let resp = warp::test::request().method("POST").path("/playback/start").reply(&api).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejections() {
        let (session, _) = session();
        let api = routes(session);

        let resp = warp::test::request()
            .method("POST")
            .path("/playback/start")
            .json(&serde_json::json!({"eventId": "solo"}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body(&resp)["error"], "No path data to animate.");

        let resp = warp::test::request()
            .method("POST")
            .path("/playback/speed")
            .json(&serde_json::json!({"multiplier": -2.0}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = warp::test::request()
            .method("POST")
            .path("/surface")
            .json(&serde_json::json!({"surface": "4d"}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = warp::test::request().method("GET").path("/nowhere").reply(&api).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_surface_switch_and_tool() {
        let (session, _) = session();
        let api = routes(session.clone());

        let resp = warp::test::request()
            .method("POST")
            .path("/surface")
            .json(&serde_json::json!({"surface": "2d"}))
            .reply(&api)
            .await;
        assert_eq!(body(&resp)["activeSurface"], "2d");

        let resp = warp::test::request().method("POST").path("/tool/engage").reply(&api).await;
        assert_eq!(body(&resp)["manualTool"], true);
        assert!(session.lock().await.manual_tool_engaged());
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (session, _) = session();
        let api = routes(session);

        let resp = warp::test::request()
            .method("OPTIONS")
            .path("/playback/start")
            .header("origin", "http://viewer.local")
            .header("access-control-request-method", "POST")
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = warp::test::request()
            .method("OPTIONS")
            .path("/playback/start")
            .header("origin", "http://viewer.local")
            .header("access-control-request-method", "DELETE")
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_optional_body_is_size_limited() {
        let (session, _) = session();
        let api = routes(session.clone());

        let resp = warp::test::request()
            .method("POST")
            .path("/playback/start")
            .body(vec![b' '; 70 * 1024])
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body(&resp)["status_code"], 413);
        assert_eq!(session.lock().await.phase(), crate::animation::Phase::Idle);
    }
}
