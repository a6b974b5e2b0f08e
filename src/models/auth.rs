// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// Dados para login do painel administrativo (senha única compartilhada)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminLoginPayload {
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    #[schema(example = "correct horse battery staple")]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (sempre "admin")
    pub exp: usize,  // Expiration time (quando o token expira)
    pub iat: usize,  // Issued At (quando o token foi criado)
}
