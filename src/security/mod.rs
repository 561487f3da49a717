use crate::config::SecurityConfig;
use crate::db::models::CameraRegistration;
use crate::error::Error;
use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for an owner session
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (registration ID)
    pub sub: String,
    /// Owner name at time of issue
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    pub fn registration_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }
}

/// Bearer token handed to an owner after registering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerToken {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiry
    pub expires_in: u64,
}

/// Issues and checks owner session tokens
#[derive(Clone)]
pub struct SecurityService {
    config: SecurityConfig,
}

impl SecurityService {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    /// Whether edits must present a matching owner token
    pub fn owner_token_required(&self) -> bool {
        self.config.require_owner_token
    }

    /// Generate a session token scoped to one registration
    pub fn issue_token(&self, registration: &CameraRegistration) -> Result<OwnerToken> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.jwt_expiration_minutes as i64);

        let claims = Claims {
            sub: registration.id.to_string(),
            name: registration.name.clone(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| Error::Authentication(format!("Failed to generate owner token: {}", e)))?;

        Ok(OwnerToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_minutes * 60,
        })
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| Error::Authentication(format!("Invalid token: {}", e)))?;

        Ok(token_data)
    }

    /// Check an `Authorization` header value against the registration it
    /// wants to touch. Passes unconditionally when owner tokens are disabled.
    pub fn authorize_owner(&self, authorization: Option<&str>, registration_id: &Uuid) -> Result<()> {
        if !self.config.require_owner_token {
            return Ok(());
        }

        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Authentication("Missing owner token".to_string()))?;

        let token_data = self.validate_token(token)?;
        let owner = token_data
            .claims
            .registration_id()
            .map_err(|e| Error::Authentication(format!("Invalid registration ID in token: {}", e)))?;

        if owner != *registration_id {
            return Err(
                Error::Authentication("Token does not belong to this registration".to_string())
                    .into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CameraType, CoverageArea, NewRegistration};
    use crate::geo::LatLng;

    fn registration() -> CameraRegistration {
        NewRegistration {
            name: "Neha Gupta".to_string(),
            email: Some("neha.gupta4@example.com".to_string()),
            phone: "9000000004".to_string(),
            camera_type: CameraType::Ip,
            coverage_area: CoverageArea::FullCoverage,
            pincode: String::new(),
            locality: "Raja Park".to_string(),
            location: LatLng {
                lat: 26.8950,
                lng: 75.8250,
            },
        }
        .into_registration()
    }

    fn service() -> SecurityService {
        SecurityService::new(SecurityConfig::default())
    }

    #[test]
    fn issued_token_authorizes_its_owner_only() {
        let security = service();
        let owner = registration();
        let token = security.issue_token(&owner).unwrap();
        assert_eq!(token.token_type, "Bearer");

        let header = format!("Bearer {}", token.access_token);
        assert!(security.authorize_owner(Some(&header), &owner.id).is_ok());

        let other = registration();
        let err = security.authorize_owner(Some(&header), &other.id).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Authentication(_))));
    }

    #[test]
    fn missing_or_garbled_tokens_are_rejected() {
        let security = service();
        let owner = registration();
        assert!(security.authorize_owner(None, &owner.id).is_err());
        assert!(security.authorize_owner(Some("Basic abc"), &owner.id).is_err());
        assert!(security.authorize_owner(Some("Bearer not.a.jwt"), &owner.id).is_err());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let owner = registration();
        let foreign = SecurityService::new(SecurityConfig {
            jwt_secret: "someone-else".to_string(),
            ..SecurityConfig::default()
        })
        .issue_token(&owner)
        .unwrap();

        let header = format!("Bearer {}", foreign.access_token);
        assert!(service().authorize_owner(Some(&header), &owner.id).is_err());
    }

    #[test]
    fn disabled_owner_tokens_allow_anyone() {
        let security = SecurityService::new(SecurityConfig {
            require_owner_token: false,
            ..SecurityConfig::default()
        });
        assert!(security.authorize_owner(None, &registration().id).is_ok());
    }
}
