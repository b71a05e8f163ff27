//! JWT authentication

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use opsdeck_common::error::{AuthError, Error, Result};

/// JWT claims
///
/// Legacy tokens carry only the namespace - no expiry, no subject - so
/// validation is configured without required registered claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub namespace: String,
}

/// JWT authenticator
#[derive(Clone, Debug)]
pub struct JwtAuth {
    secret: String,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Auth(AuthError::SecretMissing));
        }
        Ok(Self {
            secret: secret.to_string(),
        })
    }

    /// Generate a token scoped to one namespace
    pub fn generate_token(&self, namespace: &str) -> Result<String> {
        let claims = Claims {
            namespace: namespace.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::Auth(AuthError::InvalidToken(e.to_string())))
    }

    /// Validate a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| Error::Auth(AuthError::InvalidToken(e.to_string())))?;

        if token_data.claims.namespace.is_empty() {
            return Err(Error::Auth(AuthError::InvalidClaims));
        }

        Ok(token_data.claims)
    }
}
