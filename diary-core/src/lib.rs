//! Diary core library
//!
//! Entry, draft and insight lifecycle engine for a child diary: filtering,
//! template-switch reconciliation, staged attachment deletion and the
//! weekly/monthly summary workflows, plus a bundled SQLite collaborator.

pub mod api;
pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod storage;
