use crate::classify::RedisClassifier;
use crate::connector::RedisConnector;
use redis::aio::MultiplexedConnection;
use redis::{Cmd, FromRedisValue, IntoConnectionInfo, RedisError, RedisResult, ToRedisArgs};
use self_healing_connection::{
    FaultSubscription, ReconnectState, SelfHealingConfig, SelfHealingConfigBuilder,
    SelfHealingConnection,
};

#[cfg(feature = "tracing")]
use tracing::debug;

/// A self-healing multiplexed Redis connection.
///
/// Every command runs on the current multiplexed connection. A dropped or
/// refused connection, an authentication failure or a corrupted reply
/// triggers a background reconnect; replies such as `WRONGTYPE` are returned
/// to the caller and leave the connection alone.
///
/// # Examples
///
/// ```no_run
/// use self_healing_redis::SelfHealingRedis;
///
/// # #[tokio::main]
/// # async fn main() -> redis::RedisResult<()> {
/// let config = SelfHealingRedis::config_builder().name("cache").build();
/// let redis = SelfHealingRedis::open("redis://127.0.0.1/", config).await?;
///
/// redis.set("greeting", "hello").await?;
/// let greeting: Option<String> = redis.get("greeting").await?;
/// assert_eq!(greeting.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SelfHealingRedis {
    connection: SelfHealingConnection<RedisConnector>,
}

impl SelfHealingRedis {
    /// Returns a config builder that classifies errors with
    /// [`RedisClassifier::default`].
    pub fn config_builder() -> SelfHealingConfigBuilder<RedisError> {
        SelfHealingConfig::builder_untagged().classifier(RedisClassifier::default())
    }

    /// Connects to the given address.
    pub async fn open<T: IntoConnectionInfo>(
        info: T,
        config: SelfHealingConfig<RedisError>,
    ) -> RedisResult<Self> {
        Self::connect(RedisConnector::open(info)?, config).await
    }

    /// Establishes the first connection through `connector`.
    pub async fn connect(
        connector: RedisConnector,
        config: SelfHealingConfig<RedisError>,
    ) -> RedisResult<Self> {
        let connection = SelfHealingConnection::connect(connector, config).await?;
        Ok(Self { connection })
    }

    /// Wraps an established connection.
    pub fn from_connection(connection: SelfHealingConnection<RedisConnector>) -> Self {
        Self { connection }
    }

    /// Returns the underlying self-healing connection.
    pub fn connection(&self) -> &SelfHealingConnection<RedisConnector> {
        &self.connection
    }

    /// Subscribes to reconnect notifications.
    ///
    /// Redis pub/sub subscriptions do not survive a reconnect; re-subscribe
    /// when an event arrives.
    pub fn subscribe(&self) -> FaultSubscription {
        self.connection.subscribe()
    }

    /// Returns the current generation.
    pub fn generation(&self) -> u64 {
        self.connection.generation()
    }

    /// Returns reconnect statistics.
    pub fn state(&self) -> &ReconnectState {
        self.connection.state()
    }

    /// Runs an arbitrary command under the given operation name.
    pub async fn query<T>(&self, operation: &'static str, cmd: Cmd) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
    {
        #[cfg(feature = "tracing")]
        debug!(operation, generation = self.generation(), "Forwarding command");

        self.connection
            .execute(operation, move |current: &MultiplexedConnection| {
                let mut connection = current.clone();
                Box::pin(async move { cmd.query_async(&mut connection).await })
            })
            .await
    }

    /// `PING`
    pub async fn ping(&self) -> RedisResult<String> {
        self.query("PING", redis::cmd("PING")).await
    }

    /// `GET key`
    pub async fn get<T>(&self, key: impl ToRedisArgs) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
    {
        self.query("GET", command("GET", key)).await
    }

    /// `SET key value`
    pub async fn set(&self, key: impl ToRedisArgs, value: impl ToRedisArgs) -> RedisResult<()> {
        self.query("SET", command("SET", (key, value))).await
    }

    /// `SET key value EX seconds`
    pub async fn set_ex(
        &self,
        key: impl ToRedisArgs,
        value: impl ToRedisArgs,
        seconds: u64,
    ) -> RedisResult<()> {
        self.query("SET", command("SET", (key, value, "EX", seconds)))
            .await
    }

    /// `DEL key [key ...]`; returns the number of keys removed.
    pub async fn del(&self, keys: impl ToRedisArgs) -> RedisResult<u64> {
        self.query("DEL", command("DEL", keys)).await
    }

    /// `EXISTS key`
    pub async fn exists(&self, key: impl ToRedisArgs) -> RedisResult<bool> {
        self.query("EXISTS", command("EXISTS", key)).await
    }

    /// `EXPIRE key seconds`; returns whether the timeout was set.
    pub async fn expire(&self, key: impl ToRedisArgs, seconds: i64) -> RedisResult<bool> {
        self.query("EXPIRE", command("EXPIRE", (key, seconds)))
            .await
    }

    /// `INCRBY key delta`
    pub async fn incr(&self, key: impl ToRedisArgs, delta: i64) -> RedisResult<i64> {
        self.query("INCRBY", command("INCRBY", (key, delta)))
            .await
    }

    /// `HGET key field`
    pub async fn hget<T>(&self, key: impl ToRedisArgs, field: impl ToRedisArgs) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
    {
        self.query("HGET", command("HGET", (key, field))).await
    }

    /// `HSET key field value`; returns the number of fields added.
    pub async fn hset(
        &self,
        key: impl ToRedisArgs,
        field: impl ToRedisArgs,
        value: impl ToRedisArgs,
    ) -> RedisResult<u64> {
        self.query("HSET", command("HSET", (key, field, value)))
            .await
    }

    /// `HDEL key field [field ...]`
    pub async fn hdel(&self, key: impl ToRedisArgs, fields: impl ToRedisArgs) -> RedisResult<u64> {
        self.query("HDEL", command("HDEL", (key, fields))).await
    }

    /// `HGETALL key`
    pub async fn hgetall<T>(&self, key: impl ToRedisArgs) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
    {
        self.query("HGETALL", command("HGETALL", key)).await
    }

    /// `LPUSH key value [value ...]`; returns the new length.
    pub async fn lpush(&self, key: impl ToRedisArgs, values: impl ToRedisArgs) -> RedisResult<u64> {
        self.query("LPUSH", command("LPUSH", (key, values))).await
    }

    /// `RPUSH key value [value ...]`; returns the new length.
    pub async fn rpush(&self, key: impl ToRedisArgs, values: impl ToRedisArgs) -> RedisResult<u64> {
        self.query("RPUSH", command("RPUSH", (key, values))).await
    }

    /// `LRANGE key start stop`
    pub async fn lrange<T>(
        &self,
        key: impl ToRedisArgs,
        start: isize,
        stop: isize,
    ) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
    {
        self.query("LRANGE", command("LRANGE", (key, start, stop)))
            .await
    }

    /// `LLEN key`
    pub async fn llen(&self, key: impl ToRedisArgs) -> RedisResult<u64> {
        self.query("LLEN", command("LLEN", key)).await
    }

    /// `SADD key member [member ...]`; returns the number of members added.
    pub async fn sadd(&self, key: impl ToRedisArgs, members: impl ToRedisArgs) -> RedisResult<u64> {
        self.query("SADD", command("SADD", (key, members))).await
    }

    /// `SREM key member [member ...]`; returns the number of members removed.
    pub async fn srem(&self, key: impl ToRedisArgs, members: impl ToRedisArgs) -> RedisResult<u64> {
        self.query("SREM", command("SREM", (key, members))).await
    }

    /// `SMEMBERS key`
    pub async fn smembers<T>(&self, key: impl ToRedisArgs) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
    {
        self.query("SMEMBERS", command("SMEMBERS", key)).await
    }

    /// `PUBLISH channel message`; returns the number of receivers.
    pub async fn publish(
        &self,
        channel: impl ToRedisArgs,
        message: impl ToRedisArgs,
    ) -> RedisResult<u64> {
        self.query("PUBLISH", command("PUBLISH", (channel, message)))
            .await
    }
}

fn command(name: &str, args: impl ToRedisArgs) -> Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(args);
    cmd
}
