//! Bearer-token relying party for gateway endpoints.
//!
//! Each endpoint opts in through its `extra_config`; protected endpoints only
//! reach their handler with a verified HMAC JWT whose `user_role` is on the
//! endpoint's allow-list, and receive the verified `user_id` as `User-Id`.

pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod services;
