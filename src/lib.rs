// Library root
// -----------
// This crate exposes the pieces the `0x45` binary is built from. `main.rs`
// only parses arguments, sets up logging and dispatches to `ui`.
//
// Module responsibilities:
// - `config`: resolves base URL, API key and default expiry from flags,
//   environment and the YAML config file; persists `set`/`unset`.
// - `api`: one typed request/response pair per service operation, over a
//   pluggable `Transport` (reqwest in production).
// - `expiry`: parsing and key-dependent bounds for expiry durations.
// - `error`: the error taxonomy shared by `config` and `api`.
// - `ui`: command handlers and the formatting of results for the terminal.
pub mod api;
pub mod config;
pub mod error;
pub mod expiry;
pub mod ui;

pub use error::{ClientError, Result};
