// SPDX-License-Identifier: MIT

//! Application surface around the engine: graph files and the HTTP server

pub mod loader;
pub mod server;
