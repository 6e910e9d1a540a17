use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    AttendanceStatus, BatchId, ClassId, ClassPatch, JoinRequestId, NewClass, RecordId, StudentId,
};
use super::error::ClassroomError;
use super::service::ClassroomService;
use super::validation::ValidationError;

/// Router exposing class, enrollment, join request and attendance endpoints.
pub fn classroom_router(service: Arc<ClassroomService>) -> Router {
    Router::new()
        .route(
            "/api/v1/classes",
            post(create_class_handler).get(list_classes_handler),
        )
        .route(
            "/api/v1/classes/:class_id",
            get(get_class_handler)
                .patch(update_class_handler)
                .delete(delete_class_handler),
        )
        .route("/api/v1/classes/:class_id/eligible", get(eligible_handler))
        .route("/api/v1/classes/:class_id/join", post(join_open_handler))
        .route("/api/v1/classes/:class_id/students", post(add_students_handler))
        .route(
            "/api/v1/classes/:class_id/students/:student_id",
            delete(remove_student_handler),
        )
        .route(
            "/api/v1/classes/:class_id/requests",
            post(request_join_handler).get(pending_requests_handler),
        )
        .route("/api/v1/requests/:request_id/approve", post(approve_handler))
        .route("/api/v1/requests/:request_id/reject", post(reject_handler))
        .route(
            "/api/v1/classes/:class_id/attendance",
            post(create_draft_handler).get(list_attendance_handler),
        )
        .route(
            "/api/v1/attendance/:record_id",
            get(get_record_handler).delete(delete_record_handler),
        )
        .route(
            "/api/v1/attendance/:record_id/students/:student_id",
            put(mark_handler),
        )
        .route("/api/v1/attendance/:record_id/submit", post(submit_handler))
        .with_state(service)
}

type ApiResult = Result<Response, ClassroomError>;

#[derive(Debug, Deserialize)]
pub(crate) struct ListClassesQuery {
    pub batch_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeleteClassQuery {
    #[serde(default)]
    pub cascade_attendance: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentBody {
    pub student_id: StudentId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddStudentsBody {
    pub student_ids: Vec<StudentId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateDraftBody {
    pub session_date: NaiveDate,
    pub session_time: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MarkBody {
    pub status: AttendanceStatus,
}

pub(crate) async fn create_class_handler(
    State(service): State<Arc<ClassroomService>>,
    Json(new_class): Json<NewClass>,
) -> ApiResult {
    let class = service.registry().create(new_class)?;
    Ok((StatusCode::CREATED, Json(class)).into_response())
}

pub(crate) async fn list_classes_handler(
    State(service): State<Arc<ClassroomService>>,
    Query(query): Query<ListClassesQuery>,
) -> ApiResult {
    let batch_id = query
        .batch_id
        .filter(|value| !value.trim().is_empty())
        .map(BatchId)
        .ok_or_else(|| ValidationError::new("batch_id", "query parameter is required"))?;

    match query.name {
        Some(name) => {
            let class = service.registry().find_by_name(&batch_id, &name)?;
            Ok(Json(class).into_response())
        }
        None => {
            let classes = service.registry().list_by_batch(&batch_id)?;
            Ok(Json(classes).into_response())
        }
    }
}

pub(crate) async fn get_class_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
) -> ApiResult {
    let class = service.registry().get(&ClassId(class_id))?;
    Ok(Json(class).into_response())
}

pub(crate) async fn update_class_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
    Json(patch): Json<ClassPatch>,
) -> ApiResult {
    let class = service.registry().update(&ClassId(class_id), patch)?;
    Ok(Json(class).into_response())
}

pub(crate) async fn delete_class_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
    Query(query): Query<DeleteClassQuery>,
) -> ApiResult {
    let summary = service
        .registry()
        .delete(&ClassId(class_id), query.cascade_attendance)?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn eligible_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
) -> ApiResult {
    let students = service.enrollment().eligible_students(&ClassId(class_id))?;
    Ok(Json(students).into_response())
}

pub(crate) async fn join_open_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
    Json(body): Json<StudentBody>,
) -> ApiResult {
    let class = service
        .enrollment()
        .join_open(&ClassId(class_id), &body.student_id)?;
    Ok(Json(class).into_response())
}

pub(crate) async fn add_students_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
    Json(body): Json<AddStudentsBody>,
) -> ApiResult {
    let outcome = service
        .enrollment()
        .add_students(&ClassId(class_id), &body.student_ids)?;
    Ok(Json(outcome).into_response())
}

pub(crate) async fn remove_student_handler(
    State(service): State<Arc<ClassroomService>>,
    Path((class_id, student_id)): Path<(String, String)>,
) -> ApiResult {
    let class = service
        .enrollment()
        .remove_student(&ClassId(class_id), &StudentId(student_id))?;
    Ok(Json(class).into_response())
}

pub(crate) async fn request_join_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
    Json(body): Json<StudentBody>,
) -> ApiResult {
    let request = service
        .requests()
        .request_join(&ClassId(class_id), &body.student_id)?;
    Ok((StatusCode::CREATED, Json(request)).into_response())
}

pub(crate) async fn pending_requests_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
) -> ApiResult {
    let pending = service.requests().pending_for_class(&ClassId(class_id))?;
    Ok(Json(pending).into_response())
}

pub(crate) async fn approve_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(request_id): Path<String>,
) -> ApiResult {
    let request = service.requests().approve(&JoinRequestId(request_id))?;
    Ok(Json(request).into_response())
}

pub(crate) async fn reject_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(request_id): Path<String>,
) -> ApiResult {
    let request = service.requests().reject(&JoinRequestId(request_id))?;
    Ok(Json(request).into_response())
}

pub(crate) async fn create_draft_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
    Json(body): Json<CreateDraftBody>,
) -> ApiResult {
    let record = service.attendance().create_draft(
        &ClassId(class_id),
        body.session_date,
        &body.session_time,
    )?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

pub(crate) async fn list_attendance_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(class_id): Path<String>,
) -> ApiResult {
    let records = service.attendance().list_for_class(&ClassId(class_id))?;
    Ok(Json(records).into_response())
}

pub(crate) async fn get_record_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(record_id): Path<String>,
) -> ApiResult {
    let record = service.attendance().get(&RecordId(record_id))?;
    Ok(Json(record).into_response())
}

pub(crate) async fn mark_handler(
    State(service): State<Arc<ClassroomService>>,
    Path((record_id, student_id)): Path<(String, String)>,
    Json(body): Json<MarkBody>,
) -> ApiResult {
    let record = service.attendance().mark_status(
        &RecordId(record_id),
        &StudentId(student_id),
        body.status,
    )?;
    Ok(Json(record).into_response())
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(record_id): Path<String>,
) -> ApiResult {
    let record = service.attendance().submit(&RecordId(record_id))?;
    Ok(Json(record).into_response())
}

pub(crate) async fn delete_record_handler(
    State(service): State<Arc<ClassroomService>>,
    Path(record_id): Path<String>,
) -> ApiResult {
    let record = service.attendance().delete(&RecordId(record_id))?;
    Ok(Json(record).into_response())
}

impl ClassroomError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClassroomError::Validation(_)
            | ClassroomError::InvalidCapacity { .. }
            | ClassroomError::VisibilityViolation { .. }
            | ClassroomError::ClassInactive(_)
            | ClassroomError::NotInBatch { .. }
            | ClassroomError::NotInRoster { .. }
            | ClassroomError::EmptyRoster(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ClassroomError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClassroomError::CapacityExceeded { .. }
            | ClassroomError::DuplicateEnrollment { .. }
            | ClassroomError::DuplicateRequest { .. }
            | ClassroomError::DuplicateClassName { .. }
            | ClassroomError::RecordFinalized(_)
            | ClassroomError::AlreadyFinal(_)
            | ClassroomError::RequestResolved { .. }
            | ClassroomError::Conflict { .. } => StatusCode::CONFLICT,
            ClassroomError::Repository(_) | ClassroomError::Directory(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ClassroomError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, code = self.code(), "classroom request failed");
        }

        let mut payload = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let Some(field) = self.field() {
            payload["field"] = json!(field);
        }
        (status, Json(payload)).into_response()
    }
}
