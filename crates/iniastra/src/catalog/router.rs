use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use super::repository::UniversityRepository;
use super::service::{CatalogService, EligibilityRequest, UniversityDetail};
use super::stats::UniversityStats;
use super::validation::UniversityPayload;
use super::views::{
    ComparisonView, EligibilityView, SimilarUniversityView, UniversityDetailView, UniversityView,
};
use crate::admissions::ApplicationRepository;
use crate::api::{AdminUser, ApiError, ApiJson, ApiQuery, Envelope, StaffUser};
use crate::query::{UniversityListParams, UniversityQuery};

#[derive(Debug, Default, Deserialize)]
pub struct CompareParams {
    pub ids: Option<String>,
}

/// `/api/universities` routes.
pub fn university_router<U, A>(service: Arc<CatalogService<U, A>>) -> Router
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    Router::new()
        .route(
            "/api/universities",
            get(list_handler::<U, A>).post(create_handler::<U, A>),
        )
        .route("/api/universities/compare", get(compare_handler::<U, A>))
        .route(
            "/api/universities/stats/overview",
            get(stats_handler::<U, A>),
        )
        .route(
            "/api/universities/:id",
            get(get_handler::<U, A>)
                .put(update_handler::<U, A>)
                .delete(delete_handler::<U, A>),
        )
        .route(
            "/api/universities/:id/check-eligibility",
            post(eligibility_handler::<U, A>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<U, A>(
    State(service): State<Arc<CatalogService<U, A>>>,
    ApiQuery(params): ApiQuery<UniversityListParams>,
) -> Result<Envelope<Vec<UniversityView>>, ApiError>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let page = service.list(UniversityQuery::from_params(&params)).await?;
    let meta = page.meta();
    Ok(Envelope::paged(
        meta,
        page.items.iter().map(UniversityView::from).collect(),
    ))
}

pub(crate) async fn get_handler<U, A>(
    State(service): State<Arc<CatalogService<U, A>>>,
    Path(id): Path<String>,
) -> Result<Envelope<UniversityDetailView>, ApiError>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let UniversityDetail {
        university,
        application_count,
        similar,
    } = service.get(&id).await?;

    Ok(Envelope::ok(UniversityDetailView {
        university: UniversityView::from(university),
        application_count,
        similar_universities: similar.iter().map(SimilarUniversityView::from).collect(),
    }))
}

pub(crate) async fn create_handler<U, A>(
    State(service): State<Arc<CatalogService<U, A>>>,
    AdminUser(_admin): AdminUser,
    ApiJson(payload): ApiJson<UniversityPayload>,
) -> Result<Envelope<UniversityView>, ApiError>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let university = service.create(payload).await?;
    Ok(Envelope::created(UniversityView::from(university))
        .with_message("University created successfully"))
}

pub(crate) async fn update_handler<U, A>(
    State(service): State<Arc<CatalogService<U, A>>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UniversityPayload>,
) -> Result<Envelope<UniversityView>, ApiError>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let university = service.update(&id, payload).await?;
    Ok(Envelope::ok(UniversityView::from(university))
        .with_message("University updated successfully"))
}

pub(crate) async fn delete_handler<U, A>(
    State(service): State<Arc<CatalogService<U, A>>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    service.deactivate(&id).await?;
    Ok(Envelope::message("University deleted successfully"))
}

pub(crate) async fn compare_handler<U, A>(
    State(service): State<Arc<CatalogService<U, A>>>,
    ApiQuery(params): ApiQuery<CompareParams>,
) -> Result<Envelope<Vec<ComparisonView>>, ApiError>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let universities = service.compare(params.ids.as_deref()).await?;
    Ok(Envelope::listed(
        universities.iter().map(ComparisonView::from).collect(),
    ))
}

pub(crate) async fn eligibility_handler<U, A>(
    State(service): State<Arc<CatalogService<U, A>>>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<EligibilityRequest>,
) -> Result<Envelope<EligibilityView>, ApiError>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    Ok(Envelope::ok(service.check_eligibility(&id, request).await?))
}

pub(crate) async fn stats_handler<U, A>(
    State(service): State<Arc<CatalogService<U, A>>>,
    StaffUser(_staff): StaffUser,
) -> Result<Envelope<UniversityStats>, ApiError>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    Ok(Envelope::ok(service.stats().await?))
}
