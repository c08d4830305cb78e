use std::sync::Arc;
use axum::{
    extract::{Path, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CatalogError, CreatePackageRequest, CreateServiceRequest, UpdateServiceRequest};
use crate::services::CatalogService;

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ServiceNotFound | CatalogError::PackageNotFound => AppError::NotFound(e.to_string()),
            CatalogError::ValidationError(_) => AppError::ValidationError(e.to_string()),
            CatalogError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn ensure_admin(user: &User) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only administrators can manage the catalog".to_string()));
    }
    Ok(())
}

// ==============================================================================
// SERVICES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_admin(&user)?;

    let service = CatalogService::new(&config)
        .create_service(request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(service))))
}

#[axum::debug_handler]
pub async fn list_services(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let services = CatalogService::new(&config)
        .list_services(auth.token())
        .await?;

    Ok(Json(json!({
        "services": services,
        "total": services.len()
    })))
}

#[axum::debug_handler]
pub async fn get_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = CatalogService::new(&config)
        .get_service(service_id, auth.token())
        .await?
        .ok_or(CatalogError::ServiceNotFound)?;

    Ok(Json(json!(service)))
}

#[axum::debug_handler]
pub async fn update_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(service_id): Path<Uuid>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_admin(&user)?;

    let service = CatalogService::new(&config)
        .update_service(service_id, request, auth.token())
        .await?;

    Ok(Json(json!(service)))
}

#[axum::debug_handler]
pub async fn delete_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(service_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_admin(&user)?;

    CatalogService::new(&config)
        .delete_service(service_id, auth.token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// PACKAGES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_package(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePackageRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_admin(&user)?;

    let package = CatalogService::new(&config)
        .create_package(request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(package))))
}

#[axum::debug_handler]
pub async fn list_packages(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let packages = CatalogService::new(&config)
        .list_packages(auth.token())
        .await?;

    Ok(Json(json!({
        "packages": packages,
        "total": packages.len()
    })))
}

#[axum::debug_handler]
pub async fn get_package(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(package_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let package = CatalogService::new(&config)
        .get_package(package_id, auth.token())
        .await?
        .ok_or(CatalogError::PackageNotFound)?;

    Ok(Json(json!({
        "package": package,
        "list_price": package.list_price()
    })))
}

#[axum::debug_handler]
pub async fn delete_package(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(package_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_admin(&user)?;

    CatalogService::new(&config)
        .delete_package(package_id, auth.token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
