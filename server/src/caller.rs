use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kernel::prelude::entity::UserId;
use uuid::Uuid;

use crate::error::ErrorBody;

/// Set by the authentication proxy in front of this service.
pub const CALLER_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(UserId);

impl Caller {
    pub fn user_id(&self) -> &UserId {
        &self.0
    }

    pub fn id(&self) -> Uuid {
        *self.0.as_ref()
    }
}

#[derive(Debug)]
pub struct Unauthenticated(&'static str);

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: "unauthenticated",
            message: self.0.to_string(),
            first_in_line: None,
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Unauthenticated;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or(Unauthenticated("Missing x-user-id header"))?;
        let id = value
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(Unauthenticated("x-user-id is not a valid UUID"))?;
        Ok(Caller(UserId::new(id)))
    }
}

#[cfg(test)]
mod test {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::caller::{Caller, CALLER_HEADER};

    fn router() -> Router {
        Router::new().route("/whoami", get(|caller: Caller| async move { caller.id().to_string() }))
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let response = router()
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_header_is_unauthorized() {
        let request = Request::get("/whoami")
            .header(CALLER_HEADER, "librarian")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_header_identifies_caller() {
        let id = Uuid::new_v4();
        let request = Request::get("/whoami")
            .header(CALLER_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, id.to_string().as_bytes());
    }
}
