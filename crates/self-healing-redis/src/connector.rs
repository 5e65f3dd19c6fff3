use futures::future::BoxFuture;
use redis::aio::MultiplexedConnection;
use redis::{Client, IntoConnectionInfo, RedisError, RedisResult};
use self_healing_connection::Connector;

/// Opens multiplexed connections from a [`redis::Client`].
#[derive(Debug, Clone)]
pub struct RedisConnector {
    client: Client,
}

impl RedisConnector {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a connector from anything the client accepts as connection
    /// info, such as `"redis://127.0.0.1:6379/0"`.
    ///
    /// Only the address is validated here; no connection is made.
    pub fn open<T: IntoConnectionInfo>(info: T) -> RedisResult<Self> {
        Ok(Self::new(Client::open(info)?))
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Connector for RedisConnector {
    type Connection = MultiplexedConnection;
    type Error = RedisError;

    fn connect(&self) -> BoxFuture<'static, RedisResult<MultiplexedConnection>> {
        let client = self.client.clone();
        Box::pin(async move { client.get_multiplexed_async_connection().await })
    }
}
