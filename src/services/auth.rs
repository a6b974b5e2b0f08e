// src/services/auth.rs

use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{common::error::AppError, models::auth::Claims};

const ADMIN_SUBJECT: &str = "admin";
const TOKEN_TTL_HOURS: i64 = 12;

// Painel com senha única: o hash vem da configuração, não de uma tabela.
#[derive(Clone)]
pub struct AuthService {
    admin_password_hash: String,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(admin_password_hash: String, jwt_secret: String) -> Self {
        Self {
            admin_password_hash,
            jwt_secret,
        }
    }

    pub async fn login_admin(&self, password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let password_hash_clone = self.admin_password_hash.clone();

        // bcrypt é caro: roda fora do executor
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::warn!("Tentativa de login no painel com senha errada");
            return Err(AppError::InvalidCredentials);
        }

        self.create_token()
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        if token_data.claims.sub != ADMIN_SUBJECT {
            return Err(AppError::InvalidToken);
        }
        Ok(token_data.claims)
    }

    fn create_token(&self) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(TOKEN_TTL_HOURS);

        let claims = Claims {
            sub: ADMIN_SUBJECT.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    pub const ADMIN_PASSWORD: &str = "painel-secreto";

    /// Custo mínimo do bcrypt para os testes não ficarem lentos.
    pub fn auth_service() -> AuthService {
        let hash = bcrypt::hash(ADMIN_PASSWORD, 4).expect("hash de teste");
        AuthService::new(hash, "jwt-test-secret".into())
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::*, *};

    #[tokio::test]
    async fn correct_password_yields_a_valid_token() {
        let service = auth_service();
        let token = service.login_admin(ADMIN_PASSWORD).await.unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let service = auth_service();
        assert!(matches!(
            service.login_admin("chute").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let other = AuthService::new(String::new(), "outro-segredo".into());
        let token = other.create_token().unwrap();

        assert!(matches!(
            auth_service().validate_token(&token),
            Err(AppError::InvalidToken)
        ));
        assert!(auth_service().validate_token("nem-um-jwt").is_err());
    }
}
