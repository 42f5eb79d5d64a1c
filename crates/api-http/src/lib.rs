//! HTTP API Layer
//!
//! axum routers for the producer (`POST /task`) and monitor (`GET /`,
//! `GET /stats`) surfaces, plus a small server wrapper with graceful stop.

pub mod dashboard;
pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{monitor_router, producer_router, HttpServer, HttpServerConfig, HttpServerHandle};
