//! Client core for the bizhub collaboration platform.
//!
//! - [`translation`]: memoizing, request-coalescing translation cache
//! - [`guard`]: role-based route gating
//! - [`hooks`]: typed data access to the backend tables
//! - [`backend`]: REST and edge-function client the rest is built on

pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod hooks;
pub mod i18n;
pub mod retry;
pub mod translation;
