//! Actix-web extractors resolving the caller of a request.
//!
//! Authentication itself happens upstream; the gateway forwards the user id
//! and role as headers. The bootstrap admin key is the only credential checked
//! here.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};

use super::AdminKey;
use crate::config::{ADMIN_KEY_HEADER, USER_ID_HEADER, USER_ROLE_HEADER};
use crate::error::ErrorResponse;

const ADMIN_ROLE: &str = "admin";
const BOOTSTRAP_ADMIN_ID: &str = "admin";

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    status: StatusCode,
    message: String,
}

impl AuthError {
    fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        let code = if self.status == StatusCode::FORBIDDEN {
            "FORBIDDEN"
        } else {
            "UNAUTHORIZED"
        };
        HttpResponse::build(self.status).json(ErrorResponse {
            error: code.to_string(),
            message: self.message.clone(),
        })
    }
}

/// The caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub is_admin: bool,
}

impl CurrentUser {
    /// Creator filter for row-level visibility; `None` for administrators.
    pub fn scope(&self) -> Option<&str> {
        (!self.is_admin).then_some(self.id.as_str())
    }

    fn resolve(req: &HttpRequest) -> Result<Self, AuthError> {
        if let Some(provided) = header_value(req, ADMIN_KEY_HEADER).map(|v| SecretString::from(v.to_string()))
            && let Some(key) = req.app_data::<web::Data<AdminKey>>()
            && key.verify(provided.expose_secret())
        {
            return Ok(Self {
                id: BOOTSTRAP_ADMIN_ID.to_string(),
                is_admin: true,
            });
        }

        let id = header_value(req, USER_ID_HEADER).ok_or_else(|| {
            AuthError::unauthorized("Missing user identity. Provide X-User-Id header.")
        })?;
        let is_admin = header_value(req, USER_ROLE_HEADER)
            .is_some_and(|role| role.eq_ignore_ascii_case(ADMIN_ROLE));

        Ok(Self {
            id: id.to_string(),
            is_admin,
        })
    }
}

impl FromRequest for CurrentUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::resolve(req))
    }
}

/// Extractor that additionally requires administrator rights.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequest for AdminUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(CurrentUser::resolve(req).and_then(|user| {
            if user.is_admin {
                Ok(AdminUser(user))
            } else {
                Err(AuthError {
                    status: StatusCode::FORBIDDEN,
                    message: "Administrator rights required".to_string(),
                })
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn with_admin_key(req: TestRequest) -> HttpRequest {
        req.app_data(web::Data::new(AdminKey::new(Some("k".to_string()))))
            .to_http_request()
    }

    #[test]
    fn test_admin_key_wins() {
        let req = with_admin_key(TestRequest::default().insert_header((ADMIN_KEY_HEADER, "k")));
        let user = CurrentUser::resolve(&req).unwrap();
        assert!(user.is_admin);
        assert_eq!(user.scope(), None);
    }

    #[test]
    fn test_wrong_admin_key_falls_back_to_user_headers() {
        let req = with_admin_key(
            TestRequest::default()
                .insert_header((ADMIN_KEY_HEADER, "nope"))
                .insert_header((USER_ID_HEADER, "42")),
        );
        let user = CurrentUser::resolve(&req).unwrap();
        assert_eq!(user.id, "42");
        assert!(!user.is_admin);
        assert_eq!(user.scope(), Some("42"));
    }

    #[test]
    fn test_role_header_grants_admin() {
        let req = with_admin_key(
            TestRequest::default()
                .insert_header((USER_ID_HEADER, "7"))
                .insert_header((USER_ROLE_HEADER, "Admin")),
        );
        assert!(CurrentUser::resolve(&req).unwrap().is_admin);
    }

    #[test]
    fn test_missing_identity_is_unauthorized() {
        let req = with_admin_key(TestRequest::default());
        let err = CurrentUser::resolve(&req).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
