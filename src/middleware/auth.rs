use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("admin"))
    }

    /// Admins see every company; everyone else only their own.
    pub fn can_access_company(&self, company_id: &str) -> bool {
        self.is_admin() || self.company_id.as_deref() == Some(company_id)
    }
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => {
            req.extensions_mut().insert(data.claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Rejected bearer token");
            unauthorized("invalid_token")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Option<&str>, company_id: Option<&str>) -> Claims {
        Claims {
            sub: "user-1".into(),
            exp: 0,
            role: role.map(str::to_string),
            company_id: company_id.map(str::to_string),
        }
    }

    #[test]
    fn company_gate() {
        assert!(claims(None, Some("acme")).can_access_company("acme"));
        assert!(!claims(Some("hr"), Some("acme")).can_access_company("globex"));
        assert!(claims(Some("Admin"), None).can_access_company("globex"));
        assert!(!claims(None, None).can_access_company("acme"));
    }
}
