use anyhow::{Context, Result};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::core::{
    ErrorResponse, PredictRequest, PredictResponse, PredictorError, PredictorResult,
    ServerConfig, ServiceConfig, StatusResponse,
};
use crate::ml::PredictionService;
use crate::track_operation;

/// HTTP front end for a single loaded model.
pub struct PredictionApiServer {
    config: ServerConfig,
    service: Arc<PredictionService>,
}

impl PredictionApiServer {
    pub fn new(config: ServerConfig, service: PredictionService) -> Self {
        Self {
            config,
            service: Arc::new(service),
        }
    }

    /// Load the model named by `config`. Nothing is bound until [`run`].
    ///
    /// [`run`]: PredictionApiServer::run
    pub fn bootstrap(config: &ServiceConfig) -> PredictorResult<Self> {
        let service = PredictionService::load(&config.model.path)?;
        Ok(Self::new(config.server.clone(), service))
    }

    pub fn service(&self) -> Arc<PredictionService> {
        Arc::clone(&self.service)
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        routes(self.service(), &self.config)
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = tokio::net::lookup_host(&address)
            .await
            .with_context(|| format!("Invalid server address: {address}"))?
            .next()
            .with_context(|| format!("No socket address for {address}"))?;

        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!("Starting prediction API on {}", bound);
        server.await;
        info!("Prediction API stopped");

        Ok(())
    }
}

/// Build the full route tree around a shared, read-only service.
pub fn routes(
    service: Arc<PredictionService>,
    config: &ServerConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let message = config.service_name.clone();

    // GET /
    let status = warp::path::end()
        .and(warp::get())
        .map(move || warp::reply::json(&StatusResponse::ok(message.clone())));

    // GET /model
    let model_info = warp::path("model")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_service(Arc::clone(&service)))
        .map(|service: Arc<PredictionService>| warp::reply::json(&service.info()));

    // POST /predict
    let predict = warp::path("predict")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(config.max_body_bytes))
        .and(warp::body::json())
        .and(with_service(service))
        .and_then(handle_predict);

    // The inner recover runs under CORS so error bodies carry its headers;
    // the outer one only sees rejections raised by the CORS filter itself.
    status
        .or(model_info)
        .or(predict)
        .recover(handle_rejection)
        .with(cors(config))
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn with_service(
    service: Arc<PredictionService>,
) -> impl Filter<Extract = (Arc<PredictionService>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&service))
}

// Requests without an Origin header always pass. With CORS disabled the
// allowed-origin set is empty, so every cross-origin request is refused.
fn cors(config: &ServerConfig) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["Content-Type"]);
    if config.enable_cors {
        builder.allow_any_origin()
    } else {
        builder.allow_origins(Vec::<&str>::new())
    }
}

async fn handle_predict(
    request: PredictRequest,
    service: Arc<PredictionService>,
) -> Result<warp::reply::Json, Rejection> {
    track_operation!("predict_request");

    service
        .predict(&request.features)
        .map(|prediction| warp::reply::json(&PredictResponse { prediction }))
        .map_err(|e| warp::reject::custom(ApiError(e)))
}

/// Domain error carried through warp's rejection system.
#[derive(Debug)]
pub struct ApiError(pub PredictorError);
impl warp::reject::Reject for ApiError {}

/// Turn every rejection into a JSON error body.
async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    let (status, body) = if let Some(ApiError(e)) = err.find::<ApiError>() {
        if e.is_client_error() {
            (StatusCode::BAD_REQUEST, ErrorResponse::new(e.code(), e.to_string()))
        } else {
            error!(error = %e, "Prediction request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("internal_error", "Internal server error"),
            )
        }
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("invalid_input", format!("Invalid prediction input: {e}")),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorResponse::new("payload_too_large", "Request body is too large"),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            ErrorResponse::new("length_required", "Content-Length header is required"),
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorResponse::new("unsupported_media_type", "Expected a JSON request body"),
        )
    } else if let Some(e) = err.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, ErrorResponse::new("cors_forbidden", e.to_string()))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorResponse::new("method_not_allowed", "Method not allowed"),
        )
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, ErrorResponse::new("not_found", "Not Found"))
    } else {
        error!(rejection = ?err, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("internal_error", "Internal server error"),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status).into_response())
}
