/// JWT Authentication Middleware
///
/// Runs the authentication gate on every request to a wrapped resource and
/// injects `AuthenticatedAccount` into the request extensions for handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{authenticate, authorization_header, AccessTokenCodec};
use crate::error::AppError;
use crate::store::AccountStore;

/// Authentication gate for protected resources
pub struct AuthenticationGate {
    codec: Arc<AccessTokenCodec>,
    accounts: Arc<dyn AccountStore>,
}

impl AuthenticationGate {
    pub fn new(codec: Arc<AccessTokenCodec>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { codec, accounts }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthenticationGateService {
            service: Rc::new(service),
            codec: self.codec.clone(),
            accounts: self.accounts.clone(),
        }))
    }
}

pub struct AuthenticationGateService<S> {
    service: Rc<S>,
    codec: Arc<AccessTokenCodec>,
    accounts: Arc<dyn AccountStore>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header = authorization_header(req.headers()).map(str::to_owned);
        let service = self.service.clone();
        let codec = self.codec.clone();
        let accounts = self.accounts.clone();

        Box::pin(async move {
            match authenticate(header.as_deref(), &codec, accounts.as_ref()).await {
                Ok(account) => {
                    tracing::debug!(
                        account_id = account.account_id,
                        path = %req.path(),
                        "Request authenticated"
                    );
                    req.extensions_mut().insert(account);
                    service.call(req).await
                }
                Err(AppError::Auth(rejection)) => {
                    tracing::warn!(
                        reason = %rejection,
                        path = %req.path(),
                        "Request rejected by authentication gate"
                    );
                    Err(AppError::Auth(rejection).into())
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}
