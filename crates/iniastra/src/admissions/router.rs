use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Router;

use super::repository::ApplicationRepository;
use super::service::AdmissionsService;
use super::stats::ApplicationStats;
use super::validation::{ApplicationSubmission, AssignRequest, NoteRequest, StatusUpdate};
use super::views::{ApplicationView, ReviewNoteView, ReviewNotesView};
use crate::accounts::UserRepository;
use crate::api::{AdminUser, ApiError, ApiJson, ApiQuery, Envelope, StaffUser};
use crate::catalog::UniversityRepository;
use crate::query::{ApplicationListParams, ApplicationQuery};

/// `/api/applications` routes.
pub fn application_router<A, U, Us>(service: Arc<AdmissionsService<A, U, Us>>) -> Router
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    Router::new()
        .route(
            "/api/applications",
            post(submit_handler::<A, U, Us>).get(list_handler::<A, U, Us>),
        )
        .route(
            "/api/applications/stats/overview",
            get(stats_handler::<A, U, Us>),
        )
        .route(
            "/api/applications/student/:email",
            get(student_handler::<A, U, Us>),
        )
        .route("/api/applications/:id", get(get_handler::<A, U, Us>))
        .route(
            "/api/applications/:id/status",
            patch(status_handler::<A, U, Us>),
        )
        .route(
            "/api/applications/:id/assign",
            patch(assign_handler::<A, U, Us>),
        )
        .route("/api/applications/:id/notes", post(note_handler::<A, U, Us>))
        .with_state(service)
}

pub(crate) async fn submit_handler<A, U, Us>(
    State(service): State<Arc<AdmissionsService<A, U, Us>>>,
    ApiJson(submission): ApiJson<ApplicationSubmission>,
) -> Result<Envelope<ApplicationView>, ApiError>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    let detail = service.submit(submission).await?;
    Ok(Envelope::created(detail.view()).with_message("Application submitted successfully"))
}

pub(crate) async fn list_handler<A, U, Us>(
    State(service): State<Arc<AdmissionsService<A, U, Us>>>,
    StaffUser(_staff): StaffUser,
    ApiQuery(params): ApiQuery<ApplicationListParams>,
) -> Result<Envelope<Vec<ApplicationView>>, ApiError>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    let page = service.list(ApplicationQuery::from_params(&params)).await?;
    let meta = page.meta();
    Ok(Envelope::paged(
        meta,
        page.items.iter().map(|detail| detail.view()).collect(),
    ))
}

pub(crate) async fn stats_handler<A, U, Us>(
    State(service): State<Arc<AdmissionsService<A, U, Us>>>,
    StaffUser(_staff): StaffUser,
) -> Result<Envelope<ApplicationStats>, ApiError>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    Ok(Envelope::ok(service.stats().await?))
}

pub(crate) async fn student_handler<A, U, Us>(
    State(service): State<Arc<AdmissionsService<A, U, Us>>>,
    Path(email): Path<String>,
) -> Result<Envelope<Vec<ApplicationView>>, ApiError>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    let details = service.by_student(&email).await?;
    Ok(Envelope::listed(
        details.iter().map(|detail| detail.view()).collect(),
    ))
}

pub(crate) async fn get_handler<A, U, Us>(
    State(service): State<Arc<AdmissionsService<A, U, Us>>>,
    StaffUser(_staff): StaffUser,
    Path(id): Path<String>,
) -> Result<Envelope<ApplicationView>, ApiError>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    let detail = service.get(&id).await?;
    Ok(Envelope::ok(detail.view()))
}

pub(crate) async fn status_handler<A, U, Us>(
    State(service): State<Arc<AdmissionsService<A, U, Us>>>,
    StaffUser(_staff): StaffUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Envelope<ApplicationView>, ApiError>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    let detail = service.update_status(&id, update).await?;
    let message = format!(
        "Application status updated to {}",
        detail.application.status
    );
    Ok(Envelope::ok(detail.view()).with_message(message))
}

pub(crate) async fn assign_handler<A, U, Us>(
    State(service): State<Arc<AdmissionsService<A, U, Us>>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<AssignRequest>,
) -> Result<Envelope<ApplicationView>, ApiError>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    let detail = service.assign(&id, request).await?;
    Ok(Envelope::ok(detail.view()).with_message("Application assigned successfully"))
}

pub(crate) async fn note_handler<A, U, Us>(
    State(service): State<Arc<AdmissionsService<A, U, Us>>>,
    StaffUser(_staff): StaffUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<NoteRequest>,
) -> Result<Envelope<ReviewNotesView>, ApiError>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    let notes = service.add_note(&id, request).await?;
    Ok(Envelope::ok(ReviewNotesView {
        notes: notes.iter().map(ReviewNoteView::from).collect(),
    })
    .with_message("Review note added successfully"))
}
