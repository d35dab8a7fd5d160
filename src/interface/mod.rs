//! Interface layer - HTTP API

pub mod api;
