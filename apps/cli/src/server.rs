//! HTTP surface: story creation, video assembly, the catalog and static
//! access to everything under the stories root.

use std::{net::SocketAddr, path::Path, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use storyreel_core::{
    ErrorClass, StoryError, StoryGenerator, StoryId, StoryPipeline, create_story,
    list_completed_stories,
};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct ApiState {
    pipeline: StoryPipeline,
    generator: Arc<dyn StoryGenerator>,
}

impl ApiState {
    pub fn new(pipeline: StoryPipeline, generator: Arc<dyn StoryGenerator>) -> Self {
        Self {
            pipeline,
            generator,
        }
    }

    fn stories_root(&self) -> &Path {
        &self.pipeline.config().stories_root
    }
}

/// Error body sent to clients; details stay in the server log
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    fn from_build(err: &StoryError) -> Self {
        match err {
            StoryError::InvalidStoryId { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "error. invalid id")
            }
            StoryError::StoryNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "error. story not found")
            }
            StoryError::Normalization { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "File renaming failed")
            }
            other => match other.class() {
                ErrorClass::Client => Self::new(StatusCode::BAD_REQUEST, "Bad request"),
                ErrorClass::Server => {
                    Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Video processing failed")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/test", get(health_check))
        .route("/create-story", get(create_story_handler))
        .route("/build-video", get(build_video))
        .route("/samples", get(samples))
        .fallback_service(ServeDir::new(state.stories_root()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: ApiState, listen: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;
    info!(%listen, stories_root = %state.stories_root().display(), "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

async fn health_check() -> Json<&'static str> {
    Json("test ok")
}

#[derive(Debug, Deserialize)]
pub struct CreateStoryParams {
    url: Option<String>,
}

async fn create_story_handler(
    State(state): State<ApiState>,
    Query(params): Query<CreateStoryParams>,
) -> Result<Json<String>, ApiError> {
    let Some(url) = params.url.filter(|u| !u.trim().is_empty()) else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "error. missing url"));
    };

    // Runs to completion even if the client disconnects
    let generator = Arc::clone(&state.generator);
    let root = state.stories_root().to_path_buf();
    let task_url = url.clone();
    let run =
        tokio::spawn(async move { create_story(generator.as_ref(), &root, &task_url).await });

    let failed = || {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create the story",
        )
    };
    match run.await {
        Ok(Ok(id)) => Ok(Json(id.to_string())),
        Ok(Err(e)) => {
            error!(%url, error = %e, "Failed to create the story");
            Err(failed())
        }
        Err(e) => {
            error!(%url, error = %e, "Story creation task did not finish");
            Err(failed())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BuildVideoParams {
    id: Option<String>,
}

async fn build_video(
    State(state): State<ApiState>,
    Query(params): Query<BuildVideoParams>,
) -> Result<Json<String>, ApiError> {
    let Some(raw_id) = params.id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "error. missing id"));
    };

    let id = match StoryId::parse(&raw_id) {
        Ok(id) => id,
        Err(e) => {
            warn!(id = %raw_id, error = %e, "Rejected build request");
            return Err(ApiError::from_build(&e));
        }
    };

    // Runs to completion even if the client disconnects
    let pipeline = state.pipeline.clone();
    let result = match tokio::spawn(async move { pipeline.build(&id).await }).await {
        Ok(result) => result,
        Err(e) => {
            error!(id = %raw_id, error = %e, "Build task did not finish");
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Video processing failed",
            ));
        }
    };

    match result {
        Ok(video) => Ok(Json(video.relative_path)),
        Err(e) => {
            match e.class() {
                ErrorClass::Client => warn!(id = %raw_id, error = %e, "Rejected build request"),
                ErrorClass::Server => error!(id = %raw_id, error = %e, "Video processing failed"),
            }
            Err(ApiError::from_build(&e))
        }
    }
}

async fn samples(State(state): State<ApiState>) -> Result<Json<Vec<String>>, ApiError> {
    match list_completed_stories(state.stories_root()).await {
        Ok(ids) => Ok(Json(ids.into_iter().map(|id| id.to_string()).collect())),
        Err(e) => {
            error!(error = %e, "Failed to list stories");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list stories",
            ))
        }
    }
}
