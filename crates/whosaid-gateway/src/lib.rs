// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the whosaid trivia server.
//!
//! Thin axum layer over the game core: JSON in, outcome-to-status mapping
//! out, plus static serving of the front end. No game rules live here.

pub mod handlers;
pub mod server;

pub use server::{start_server, GatewayState, ServerConfig};
