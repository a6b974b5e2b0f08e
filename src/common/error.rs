use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Erro único dos serviços e do store. Falhas de e-mail têm tipo próprio (MailError)
// e nunca chegam aqui.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Código {code} já atingiu o limite de {max_uses} usos")]
    AtCapacity { code: String, max_uses: i32 },

    #[error("Finder fee já registrada para {referred_party} via {finder_code}")]
    DuplicateFinderFee {
        finder_code: String,
        referred_party: String,
    },

    #[error("Registro já existe: {0}")]
    AlreadyExists(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Assinatura do webhook inválida")]
    InvalidSignature,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Atalho para erros de banco que viram "já existe" em violação de unicidade.
    pub fn from_unique_violation(e: sqlx::Error, what: impl Into<String>) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::AlreadyExists(what.into());
            }
        }
        AppError::DatabaseError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            // Distinto de NotFound: o app oferece "comprar mais assentos" em vez de "código inválido".
            AppError::AtCapacity { code, max_uses } => {
                let body = Json(json!({
                    "error": "code_at_capacity",
                    "code": code,
                    "maxUses": max_uses,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::DuplicateFinderFee {
                finder_code,
                referred_party,
            } => {
                let body = Json(json!({
                    "error": "duplicate_finder_fee",
                    "finderCode": finder_code,
                    "referredParty": referred_party,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} não encontrado.", what)),
            AppError::AlreadyExists(what) => (StatusCode::CONFLICT, format!("{} já existe.", what)),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Senha inválida.".to_string()),
            AppError::InvalidToken | AppError::JwtError(_) => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::InvalidSignature => (
                StatusCode::BAD_REQUEST,
                "Assinatura do webhook inválida.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError, Bcrypt) viram 500.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_capacity_is_distinct_from_not_found() {
        let capacity = AppError::AtCapacity {
            code: "TEAM-AAAA-BBBB-CCCC".into(),
            max_uses: 12,
        }
        .into_response();
        let missing = AppError::NotFound("Código".into()).into_response();

        assert_eq!(capacity.status(), StatusCode::CONFLICT);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn database_errors_are_hidden_behind_500() {
        let response = AppError::DatabaseError(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
