#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

//! xbmcmd library: the pieces behind the `xbmcmd` binary.
//!
//! - `rpc` — JSON-RPC 2.0 request/response types
//! - `commands` — per-command schemas and the request builder
//! - `client` — HTTP transport
//! - `movies` — movie records and the title index
//! - `session` — command dispatch and output formatting
//! - `shell` — interactive loop with tab-completion
//! - `config` — CLI, TOML and environment configuration

pub mod client;
pub mod commands;
pub mod config;
pub mod movies;
pub mod rpc;
pub mod session;
pub mod shell;
