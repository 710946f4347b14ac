//! Redis command sequences shared by the single-node and cluster stores.

use redis::aio::ConnectionLike;
use std::time::Duration;

use super::{parse_counter, ttl_seconds};
use crate::error::StoreError;

pub(crate) async fn initialize<C>(conn: &mut C, key: &str, ttl: Duration) -> Result<(), StoreError>
where
    C: ConnectionLike + Send,
{
    redis::pipe()
        .atomic()
        .cmd("SET")
        .arg(key)
        .arg(1)
        .ignore()
        .cmd("EXPIRE")
        .arg(key)
        .arg(ttl_seconds(ttl))
        .ignore()
        .query_async::<_, ()>(conn)
        .await?;
    Ok(())
}

pub(crate) async fn increment<C>(conn: &mut C, key: &str) -> Result<(), StoreError>
where
    C: ConnectionLike + Send,
{
    redis::cmd("INCR").arg(key).query_async::<_, i64>(conn).await?;
    Ok(())
}

pub(crate) async fn arm_cooldown<C>(
    conn: &mut C,
    key: &str,
    ttl: Duration,
) -> Result<(), StoreError>
where
    C: ConnectionLike + Send,
{
    redis::pipe()
        .atomic()
        .cmd("INCR")
        .arg(key)
        .ignore()
        .cmd("EXPIRE")
        .arg(key)
        .arg(ttl_seconds(ttl))
        .ignore()
        .query_async::<_, ()>(conn)
        .await?;
    Ok(())
}

pub(crate) async fn read<C>(conn: &mut C, key: &str) -> Result<i64, StoreError>
where
    C: ConnectionLike + Send,
{
    let raw: Option<String> = redis::cmd("GET").arg(key).query_async(conn).await?;
    parse_counter(key, raw)
}

pub(crate) async fn remove<C>(conn: &mut C, key: &str) -> Result<(), StoreError>
where
    C: ConnectionLike + Send,
{
    redis::cmd("DEL").arg(key).query_async::<_, i64>(conn).await?;
    Ok(())
}

pub(crate) async fn ping<C>(conn: &mut C) -> Result<(), StoreError>
where
    C: ConnectionLike + Send,
{
    redis::cmd("PING").query_async::<_, String>(conn).await?;
    Ok(())
}
