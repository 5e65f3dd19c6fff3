//! [`tower::Service`] support for self-healing connections.

use crate::connection::SelfHealingConnection;
use crate::connector::Connector;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

/// A self-healing connection whose connection is itself a `Service` can be
/// used as a `Service`.
///
/// Each request is sent through a clone of the current connection, so the
/// connection must be cheap to clone (multiplexed clients usually are). The
/// request's type name is used as the operation name.
impl<K, Request> Service<Request> for SelfHealingConnection<K>
where
    K: Connector,
    K::Connection: Service<Request, Error = K::Error> + Clone,
    <K::Connection as Service<Request>>::Response: Send + 'static,
    <K::Connection as Service<Request>>::Future: Send + 'static,
    Request: Send + 'static,
{
    type Response = <K::Connection as Service<Request>>::Response;
    type Error = K::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is checked per call on the connection clone.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let connection = self.clone();
        Box::pin(async move {
            connection
                .execute(std::any::type_name::<Request>(), move |current| {
                    let service = current.clone();
                    Box::pin(service.oneshot(request))
                })
                .await
        })
    }
}
