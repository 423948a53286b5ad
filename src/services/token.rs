// src/services/token.rs

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;

use crate::models::{
    auth::{Claims, Identity, User},
    roles::RoleSet,
};

// Validade fixa do token de acesso
pub const ACCESS_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expirado")]
    Expired,
    #[error("token malformado")]
    Malformed,
    #[error("assinatura inválida")]
    SignatureInvalid,
    #[error("chave de assinatura ausente")]
    MissingKey,
    #[error("falha ao assinar o token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            // Algoritmo fora da família HMAC conta como assinatura inválida
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::SignatureInvalid
            }
            _ => TokenError::Malformed,
        }
    }
}

/// Emite e valida os tokens de acesso (JWT HMAC).
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Falha fechado: sem chave não há serviço.
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::MissingKey);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user.id, &user.roles, None, Utc::now())
    }

    /// Token para `target` emitido por um admin; o claim `imp` registra quem emitiu.
    pub fn issue_impersonation(&self, target: &User, admin_id: i64) -> Result<String, TokenError> {
        self.issue_at(target.id, &target.roles, Some(admin_id), Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: i64,
        roles: &str,
        impersonator: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            roles: roles.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(ACCESS_TOKEN_TTL_DAYS)).timestamp(),
            imp: impersonator,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    pub fn validate(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::Malformed)?;

        Ok(Identity {
            user_id,
            roles: RoleSet::parse(&claims.roles),
            impersonator: claims.imp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roles::RoleClaim;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn service() -> TokenService {
        TokenService::new("segredo-de-teste").unwrap()
    }

    #[test]
    fn issued_token_validates_with_same_claims() {
        let svc = service();
        let token = svc
            .issue_at(42, "school_admin:34,vendor_admin:12", None, Utc::now())
            .unwrap();

        let identity = svc.validate(&token).unwrap();
        assert_eq!(identity.user_id, 42);
        assert_eq!(
            identity.roles.claims(),
            &[RoleClaim::school_admin(34), RoleClaim::vendor_admin(12)]
        );
        assert_eq!(identity.impersonator, None);
    }

    #[test]
    fn token_expires_after_seven_days() {
        let svc = service();
        let still_valid = svc
            .issue_at(1, "admin", None, Utc::now() - Duration::days(6))
            .unwrap();
        let expired = svc
            .issue_at(1, "admin", None, Utc::now() - Duration::days(8))
            .unwrap();

        assert!(svc.validate(&still_valid).is_ok());
        assert!(matches!(svc.validate(&expired), Err(TokenError::Expired)));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = service().issue_at(1, "admin", None, Utc::now()).unwrap();
        let other = TokenService::new("outra-chave").unwrap();

        assert!(matches!(other.validate(&token), Err(TokenError::SignatureInvalid)));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        // {"alg":"none","typ":"JWT"} . {"sub":"1","roles":"admin",...} . (vazio)
        let now = Utc::now().timestamp();
        let header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let payload = URL_SAFE_NO_PAD.encode(format!(
            r#"{{"sub":"1","roles":"admin","iat":{now},"exp":{}}}"#,
            now + 3600
        ));
        let token = format!("{header}.{payload}.");

        let err = service().validate(&token).unwrap_err();
        assert!(matches!(err, TokenError::Malformed | TokenError::SignatureInvalid));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(service().validate("nao-e-um-jwt"), Err(TokenError::Malformed)));
    }

    #[test]
    fn empty_key_fails_closed() {
        assert!(matches!(TokenService::new(""), Err(TokenError::MissingKey)));
        assert!(matches!(TokenService::new("   "), Err(TokenError::MissingKey)));
    }

    #[test]
    fn impersonation_claim_round_trips() {
        let svc = service();
        let token = svc.issue_at(7, "vendor_admin:3", Some(1), Utc::now()).unwrap();

        let identity = svc.validate(&token).unwrap();
        assert_eq!(identity.user_id, 7);
        assert_eq!(identity.impersonator, Some(1));
    }
}
