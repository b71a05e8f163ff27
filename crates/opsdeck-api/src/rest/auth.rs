//! Bearer-token authentication middleware
//!
//! Every dashboard route sits behind this middleware: it validates the
//! `Authorization: Bearer` header against the shared secret and injects
//! the token's namespace into request extensions, where the `Namespace`
//! extractor picks it up for handlers.

use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest, ResponseError};
use futures::future::LocalBoxFuture;

use opsdeck_common::error::{AuthError, Error};
use opsdeck_security::JwtAuth;

use super::error::ApiError;

/// Namespace the authenticated caller is scoped to.
#[derive(Debug, Clone)]
pub struct Namespace(pub String);

impl FromRequest for Namespace {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Namespace>()
                .cloned()
                .ok_or_else(|| ApiError::from(Error::Auth(AuthError::MissingHeader)).into()),
        )
    }
}

/// Middleware factory requiring a valid bearer token.
pub struct RequireAuth {
    auth: Rc<JwtAuth>,
}

impl RequireAuth {
    #[must_use]
    pub fn new(auth: JwtAuth) -> Self {
        Self {
            auth: Rc::new(auth),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = RequireAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthMiddleware {
            service: Rc::new(service),
            auth: Rc::clone(&self.auth),
        }))
    }
}

pub struct RequireAuthMiddleware<S> {
    service: Rc<S>,
    auth: Rc<JwtAuth>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let auth = Rc::clone(&self.auth);

        Box::pin(async move {
            match authenticate(&auth, req.request()) {
                Ok(namespace) => {
                    req.extensions_mut().insert(Namespace(namespace));
                    service
                        .call(req)
                        .await
                        .map(|res| res.map_into_left_body())
                }
                Err(err) => {
                    let response = ApiError::from(err).error_response().map_into_right_body();
                    Ok(req.into_response(response))
                }
            }
        })
    }
}

/// Extract and validate the bearer token, returning its namespace.
fn authenticate(auth: &JwtAuth, req: &HttpRequest) -> Result<String, Error> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::Auth(AuthError::MissingHeader))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(Error::Auth(AuthError::NotBearer))?;

    Ok(auth.validate_token(token)?.namespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn jwt() -> JwtAuth {
        JwtAuth::new("middleware-test-secret").unwrap()
    }

    #[test]
    fn missing_header_is_rejected() {
        let req = TestRequest::default().to_http_request();
        let err = authenticate(&jwt(), &req).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::MissingHeader)));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_http_request();
        let err = authenticate(&jwt(), &req).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::NotBearer)));
    }

    #[test]
    fn valid_token_yields_its_namespace() {
        let auth = jwt();
        let token = auth.generate_token("ops-team").unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();
        assert_eq!(authenticate(&auth, &req).unwrap(), "ops-team");
    }
}
