//! HTTP surface of PyLearn: configuration, the axum router, bearer-session
//! middleware and the seed routine used by the binary.

pub mod auth;
pub mod config;
pub mod errors;
pub mod routes;
pub mod seed;
pub mod state;
