//! Learner ML service: HTTP boundary over `learner-lib`

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
