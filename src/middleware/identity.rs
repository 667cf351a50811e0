/// Identity-token middleware
///
/// Verifies the RS256 identity token from the Authorization header and
/// injects the verified claims into request extensions for route handlers.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::AuthService;
use crate::error::AppError;

pub struct IdentityMiddleware {
    auth_service: web::Data<AuthService>,
}

impl IdentityMiddleware {
    pub fn new(auth_service: web::Data<AuthService>) -> Self {
        Self { auth_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            auth_service: self.auth_service.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    auth_service: web::Data<AuthService>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer_token = req
            .headers()
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::to_string);

        let token = match bearer_token {
            Some(token) => token,
            None => {
                tracing::warn!("missing or malformed Authorization header");
                let err: Error = AppError::authorization("missing authentication token").into();
                let response = req
                    .into_response(HttpResponse::from_error(err))
                    .map_into_right_body();
                return Box::pin(async move { Ok(response) });
            }
        };

        match self.auth_service.verify_identity(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            Err(err) => {
                let err: Error = err.into();
                let response = req
                    .into_response(HttpResponse::from_error(err))
                    .map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
