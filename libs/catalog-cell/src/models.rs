use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A billable medical service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalService {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

/// A named bundle of distinct services, priced with a bundle discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePackage {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub services: Vec<MedicalService>,
}

impl ServicePackage {
    /// Sum of the member services' prices before any discount.
    pub fn list_price(&self) -> Decimal {
        self.services.iter().map(|s| s.price).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackageRequest {
    pub name: String,
    pub description: Option<String>,
    pub service_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Service not found")]
    ServiceNotFound,

    #[error("Package not found")]
    PackageNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for CatalogError {
    fn from(e: anyhow::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(price: i64) -> MedicalService {
        MedicalService {
            id: Uuid::new_v4(),
            name: "Consultation".to_string(),
            description: None,
            price: Decimal::new(price, 0),
        }
    }

    #[test]
    fn test_list_price_sums_services() {
        let package = ServicePackage {
            id: Uuid::new_v4(),
            name: "Check-up".to_string(),
            description: None,
            services: vec![service(100), service(50)],
        };
        assert_eq!(package.list_price(), Decimal::new(150, 0));
    }

    #[test]
    fn test_package_without_embedded_services_deserializes() {
        let package: ServicePackage = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "name": "Empty",
            "description": null
        }))
        .unwrap();
        assert!(package.services.is_empty());
        assert_eq!(package.list_price(), Decimal::ZERO);
    }

    #[test]
    fn test_price_accepts_json_numbers() {
        let service: MedicalService = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "name": "X-ray",
            "description": null,
            "price": 49.5
        }))
        .unwrap();
        assert_eq!(service.price, Decimal::new(495, 1));
    }
}
