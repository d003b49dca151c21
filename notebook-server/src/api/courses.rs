//! Course endpoints
//!
//! Handlers only check ownership and translate requests; all invariants
//! live in the services.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use notebook_common::Error;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{CoursePatch, CourseSummary, ModuleDraft, ModuleInput, PersistedCourse};
use crate::services::export::{export_filename, render_markdown};
use crate::services::{ActionType, EventDetails, GenerationOptions};
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct CreateFromFileRequest {
    pub file_id: Uuid,
    #[serde(default)]
    pub options: Option<GenerationOptions>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub modules: Option<Vec<ModuleInput>>,
}

impl From<UpdateCourseRequest> for CoursePatch {
    fn from(req: UpdateCourseRequest) -> Self {
        CoursePatch {
            title: req.title,
            description: req.description,
            modules: req
                .modules
                .map(|modules| modules.into_iter().map(ModuleDraft::from).collect()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplaceModulesRequest {
    pub modules: Vec<ModuleInput>,
}

/// Load a course and check that the caller owns it
async fn owned_course(state: &AppState, user: Uuid, course_id: Uuid) -> ApiResult<PersistedCourse> {
    let course = state
        .store
        .find_by_id(course_id)
        .await?
        .ok_or_else(|| Error::NotFound("Course not found".to_string()))?;

    if course.owner_id != user {
        return Err(Error::Authorization("Not authorized to access this course".to_string()).into());
    }
    Ok(course)
}

/// GET /api/courses/available-models
pub async fn available_models(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Json<Map<String, Value>> {
    Json(
        state
            .catalog
            .models()
            .iter()
            .map(|m| (m.id.to_string(), json!(m)))
            .collect(),
    )
}

/// GET /api/courses/available-engines
pub async fn available_engines(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Json<Map<String, Value>> {
    Json(
        state
            .catalog
            .engines()
            .iter()
            .map(|e| (e.id.to_string(), json!(e)))
            .collect(),
    )
}

/// POST /api/courses/create-from-file
pub async fn create_from_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<CreateFromFileRequest>,
) -> ApiResult<(StatusCode, Json<PersistedCourse>)> {
    let options = req.options.unwrap_or_default();
    let course = state
        .pipeline
        .create_from_file(user, req.file_id, &options)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /api/courses/my-courses
pub async fn my_courses(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<Json<Vec<CourseSummary>>> {
    Ok(Json(state.store.list_summaries(user).await?))
}

/// GET /api/courses/:id
pub async fn get_course(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Json<PersistedCourse>> {
    Ok(Json(owned_course(&state, user, course_id).await?))
}

/// PUT /api/courses/:id
pub async fn update_course(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(course_id): Path<Uuid>,
    Json(req): Json<UpdateCourseRequest>,
) -> ApiResult<Json<PersistedCourse>> {
    owned_course(&state, user, course_id).await?;

    let patch = CoursePatch::from(req);
    let course = state.store.update(course_id, &patch).await?;

    let mut updated: Vec<Value> = Vec::new();
    if patch.title.is_some() {
        updated.push("title".into());
    }
    if patch.description.is_some() {
        updated.push("description".into());
    }
    if patch.modules.is_some() {
        updated.push("modules".into());
    }
    state
        .ledger
        .record_event(
            user,
            ActionType::CourseUpdate,
            &EventDetails::new()
                .with("courseId", course_id.to_string())
                .with("updatedFields", updated),
        )
        .await;

    Ok(Json(course))
}

/// PUT /api/courses/:id/modules
pub async fn replace_modules(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(course_id): Path<Uuid>,
    Json(req): Json<ReplaceModulesRequest>,
) -> ApiResult<Json<PersistedCourse>> {
    owned_course(&state, user, course_id).await?;

    let modules: Vec<ModuleDraft> = req.modules.into_iter().map(ModuleDraft::from).collect();
    let module_count = modules.len();
    let course = state.store.replace_modules(course_id, modules).await?;

    state
        .ledger
        .record_event(
            user,
            ActionType::CourseUpdate,
            &EventDetails::new()
                .with("courseId", course_id.to_string())
                .with("moduleCount", module_count),
        )
        .await;

    Ok(Json(course))
}

/// DELETE /api/courses/:id
pub async fn delete_course(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let course = owned_course(&state, user, course_id).await?;

    state.store.delete(course_id).await?;

    state
        .ledger
        .record_event(
            user,
            ActionType::CourseDelete,
            &EventDetails::new()
                .with("courseId", course_id.to_string())
                .with("title", course.title),
        )
        .await;

    Ok(Json(json!({"message": "Course deleted successfully"})))
}

/// GET /api/courses/:id/export/markdown
pub async fn export_markdown(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(course_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let course = owned_course(&state, user, course_id).await?;

    let filename: String = export_filename(&course.title)
        .chars()
        .filter(|c| c.is_ascii_graphic() && *c != '"' && *c != '\\')
        .collect();

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        render_markdown(&course),
    ))
}

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/api/courses/available-models", get(available_models))
        .route("/api/courses/available-engines", get(available_engines))
        .route("/api/courses/create-from-file", post(create_from_file))
        .route("/api/courses/my-courses", get(my_courses))
        .route(
            "/api/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/api/courses/:id/modules", put(replace_modules))
        .route("/api/courses/:id/export/markdown", get(export_markdown))
}
