//! Cache module for Redis-based caching
//!
//! Provides the Redis client with retry logic and the Redis-backed
//! implementation of the OTP cache tier.

pub mod otp_cache;
pub mod redis_client;

pub use otp_cache::RedisOtpCache;
pub use redis_client::RedisClient;

// Re-export commonly used types
pub use otp_shared::CacheConfig;
