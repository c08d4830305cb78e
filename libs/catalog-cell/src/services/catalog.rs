use futures::future::try_join_all;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{first_row, SupabaseClient};

use crate::models::{
    CatalogError, CreatePackageRequest, CreateServiceRequest, MedicalService, ServicePackage,
    UpdateServiceRequest,
};

const PACKAGE_SELECT: &str = "select=id,name,description,services(id,name,description,price)";

pub struct CatalogService {
    supabase: SupabaseClient,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    // ==============================================================================
    // SERVICES
    // ==============================================================================

    pub async fn create_service(
        &self,
        request: CreateServiceRequest,
        auth_token: &str,
    ) -> Result<MedicalService, CatalogError> {
        debug!("Creating medical service: {}", request.name);

        validate_name(&request.name)?;
        validate_price(request.price)?;

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/services",
            Some(auth_token),
            Some(json!({
                "name": request.name.trim(),
                "description": request.description,
                "price": request.price,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let service: MedicalService = first_row(result)?
            .ok_or_else(|| CatalogError::DatabaseError("Failed to create service".to_string()))?;

        info!("Medical service created with ID: {}", service.id);
        Ok(service)
    }

    pub async fn get_service(&self, service_id: Uuid, auth_token: &str) -> Result<Option<MedicalService>, CatalogError> {
        debug!("Fetching medical service: {}", service_id);

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        Ok(first_row(result)?)
    }

    pub async fn list_services(&self, auth_token: &str) -> Result<Vec<MedicalService>, CatalogError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/services?order=name.asc",
            Some(auth_token),
            None,
        ).await?;

        parse_rows(result)
    }

    pub async fn update_service(
        &self,
        service_id: Uuid,
        request: UpdateServiceRequest,
        auth_token: &str,
    ) -> Result<MedicalService, CatalogError> {
        debug!("Updating medical service: {}", service_id);

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            validate_name(&name)?;
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(description) = request.description {
            update_data.insert("description".to_string(), json!(description));
        }
        if let Some(price) = request.price {
            validate_price(price)?;
            update_data.insert("price".to_string(), json!(price));
        }

        if update_data.is_empty() {
            return Err(CatalogError::ValidationError("Nothing to update".to_string()));
        }

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first_row(result)?.ok_or(CatalogError::ServiceNotFound)
    }

    pub async fn delete_service(&self, service_id: Uuid, auth_token: &str) -> Result<(), CatalogError> {
        if self.get_service(service_id, auth_token).await?.is_none() {
            return Err(CatalogError::ServiceNotFound);
        }

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Medical service {} deleted", service_id);
        Ok(())
    }

    // ==============================================================================
    // PACKAGES
    // ==============================================================================

    pub async fn create_package(
        &self,
        request: CreatePackageRequest,
        auth_token: &str,
    ) -> Result<ServicePackage, CatalogError> {
        debug!("Creating service package: {} ({} services)", request.name, request.service_ids.len());

        validate_name(&request.name)?;
        validate_service_ids(&request.service_ids)?;

        // Every member must exist before the package row is written
        let services = try_join_all(
            request.service_ids.iter().map(|id| self.get_service(*id, auth_token)),
        ).await?;
        let services = services
            .into_iter()
            .collect::<Option<Vec<MedicalService>>>()
            .ok_or(CatalogError::ServiceNotFound)?;

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/packages",
            Some(auth_token),
            Some(json!({
                "name": request.name.trim(),
                "description": request.description,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let mut package: ServicePackage = first_row(result)?
            .ok_or_else(|| CatalogError::DatabaseError("Failed to create package".to_string()))?;

        let links: Vec<Value> = request.service_ids.iter()
            .map(|service_id| json!({ "package_id": package.id, "service_id": service_id }))
            .collect();

        self.supabase.execute(
            Method::POST,
            "/rest/v1/package_services",
            Some(auth_token),
            Some(Value::Array(links)),
        ).await?;

        package.services = services;
        info!("Service package created with ID: {}", package.id);
        Ok(package)
    }

    /// Fetches a package with its member services embedded.
    pub async fn get_package(&self, package_id: Uuid, auth_token: &str) -> Result<Option<ServicePackage>, CatalogError> {
        debug!("Fetching service package: {}", package_id);

        let path = format!("/rest/v1/packages?id=eq.{}&{}", package_id, PACKAGE_SELECT);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        Ok(first_row(result)?)
    }

    pub async fn list_packages(&self, auth_token: &str) -> Result<Vec<ServicePackage>, CatalogError> {
        let path = format!("/rest/v1/packages?order=name.asc&{}", PACKAGE_SELECT);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        parse_rows(result)
    }

    pub async fn delete_package(&self, package_id: Uuid, auth_token: &str) -> Result<(), CatalogError> {
        if self.get_package(package_id, auth_token).await?.is_none() {
            return Err(CatalogError::PackageNotFound);
        }

        let links_path = format!("/rest/v1/package_services?package_id=eq.{}", package_id);
        self.supabase.execute(Method::DELETE, &links_path, Some(auth_token), None).await?;

        let path = format!("/rest/v1/packages?id=eq.{}", package_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Service package {} deleted", package_id);
        Ok(())
    }
}

fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, CatalogError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| CatalogError::DatabaseError(format!("Failed to parse catalog rows: {}", e)))
}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::ValidationError("Name is required".to_string()));
    }
    Ok(())
}

pub fn validate_price(price: Decimal) -> Result<(), CatalogError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(CatalogError::ValidationError("Price cannot be negative".to_string()));
    }
    Ok(())
}

/// A package needs at least one service and may not list a service twice.
pub fn validate_service_ids(service_ids: &[Uuid]) -> Result<(), CatalogError> {
    if service_ids.is_empty() {
        return Err(CatalogError::ValidationError("A package needs at least one service".to_string()));
    }

    let mut sorted = service_ids.to_vec();
    sorted.sort();
    sorted.dedup();
    if sorted.len() != service_ids.len() {
        return Err(CatalogError::ValidationError("A package cannot repeat a service".to_string()));
    }

    Ok(())
}
