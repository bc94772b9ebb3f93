//! Jarves chat proxy library.
//!
//! Provides the proxy server (history adapter, Gemini client, HTTP API) and
//! the client-side chat session used by the terminal front-end.

pub mod api;
pub mod chat;
pub mod config;
pub mod gemini;
pub mod history;
pub mod speech;
