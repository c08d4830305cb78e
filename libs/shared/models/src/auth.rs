use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// Clinic staff may book and edit appointments on behalf of any patient.
    pub fn is_staff(&self) -> bool {
        matches!(
            self.role.as_deref(),
            Some("admin") | Some("doctor") | Some("receptionist")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: Option<&str>) -> User {
        User {
            id: "user-1".to_string(),
            email: None,
            role: role.map(str::to_string),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn test_staff_roles() {
        assert!(user_with_role(Some("admin")).is_staff());
        assert!(user_with_role(Some("doctor")).is_staff());
        assert!(user_with_role(Some("receptionist")).is_staff());
        assert!(!user_with_role(Some("patient")).is_staff());
        assert!(!user_with_role(None).is_staff());
    }

    #[test]
    fn test_only_admin_is_admin() {
        assert!(user_with_role(Some("admin")).is_admin());
        assert!(!user_with_role(Some("doctor")).is_admin());
    }
}
