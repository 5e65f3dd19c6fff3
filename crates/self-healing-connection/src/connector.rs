//! Factories producing fresh connections.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// Produces a brand-new connection to the remote store.
///
/// A connector owns whatever parameters are needed to connect (address,
/// credentials, timeouts) and treats them as opaque. It is invoked once at
/// construction and again for every reconnect attempt.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced.
    type Connection: Send + Sync + 'static;

    /// The error type shared by connecting and by operations on the
    /// connection.
    type Error: fmt::Debug + Send + 'static;

    /// Opens a new connection.
    fn connect(&self) -> BoxFuture<'static, Result<Self::Connection, Self::Error>>;
}

/// A [`Connector`] backed by a closure. See [`connector_fn`].
#[derive(Clone)]
pub struct FnConnector<F> {
    f: F,
}

/// Creates a [`Connector`] from a closure returning a future.
///
/// # Examples
///
/// ```
/// use self_healing_connection::{connector_fn, Connector};
///
/// let connector = connector_fn(|| async {
///     Ok::<_, std::io::Error>(String::from("connection"))
/// });
///
/// # tokio_test_block_on(async {
/// let connection = connector.connect().await.unwrap();
/// assert_eq!(connection, "connection");
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     futures::executor::block_on(f)
/// # }
/// ```
pub fn connector_fn<F, Fut, C, E>(f: F) -> FnConnector<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, E>> + Send + 'static,
    C: Send + Sync + 'static,
    E: fmt::Debug + Send + 'static,
{
    FnConnector { f }
}

impl<F, Fut, C, E> Connector for FnConnector<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, E>> + Send + 'static,
    C: Send + Sync + 'static,
    E: fmt::Debug + Send + 'static,
{
    type Connection = C;
    type Error = E;

    fn connect(&self) -> BoxFuture<'static, Result<C, E>> {
        Box::pin((self.f)())
    }
}

impl<F> fmt::Debug for FnConnector<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConnector")
            .field("f", &"<closure>")
            .finish()
    }
}
