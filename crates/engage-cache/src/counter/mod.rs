//! Redis-backed counter store

mod redis_counter;

pub use redis_counter::RedisCounterStore;
