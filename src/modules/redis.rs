use std::env;

use dotenvy::dotenv;
use redis::{Client, Commands, Connection, FromRedisValue, RedisResult, ToRedisArgs};

pub struct Redis {}

impl Redis {
    pub fn connect() -> RedisResult<Connection> {
        dotenv().ok();

        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        Client::open(redis_url)?.get_connection()
    }

    pub fn set_data<K: ToRedisArgs, D: ToRedisArgs + FromRedisValue>(
        conn: &mut Connection,
        key: K,
        data: D,
    ) -> RedisResult<D> {
        conn.set::<K, D, D>(key, data)
    }

    pub fn get_data<K: ToRedisArgs, D: FromRedisValue>(
        conn: &mut Connection,
        key: K,
    ) -> RedisResult<D> {
        conn.get::<K, D>(key)
    }

    pub fn has_data<K: ToRedisArgs>(conn: &mut Connection, key: K) -> RedisResult<bool> {
        conn.exists(key)
    }

    pub fn keys<K: ToRedisArgs>(conn: &mut Connection, partial: K) -> RedisResult<Vec<String>> {
        conn.keys(partial)
    }

    pub fn delete(conn: &mut Connection, key: &String) -> RedisResult<()> {
        conn.del::<&String, ()>(key)
    }
}
