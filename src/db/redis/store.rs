use redis::{Client, Commands, Connection, RedisResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::db::store::SlotStore;
use crate::error::{AppError, AppResult};

/// Bound on connecting and on every read or write against the server
const IO_TIMEOUT: Duration = Duration::from_millis(500);

/// Creates a Redis client for the hero cache slot
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed slot store over one reused synchronous connection.
///
/// Every socket operation is bounded by a timeout. A connection that fails is
/// dropped and the next call reconnects.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    timeout: Duration,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl RedisStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: IO_TIMEOUT,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    fn connect(&self) -> RedisResult<Connection> {
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        Ok(conn)
    }

    fn with_connection<T>(&self, op: impl FnOnce(&mut Connection) -> RedisResult<T>) -> AppResult<T> {
        let mut slot = self
            .conn
            .lock()
            .map_err(|e| AppError::Internal(format!("Redis connection lock poisoned: {}", e)))?;

        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };

        let value = op(&mut conn)?;
        *slot = Some(conn);
        Ok(value)
    }
}

impl SlotStore for RedisStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.with_connection(|conn| conn.get(key))
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.with_connection(|conn| conn.set(key, value))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
