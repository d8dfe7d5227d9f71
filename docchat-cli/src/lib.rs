//! `docchat` command-line interface.
//!
//! Every global option can also be set through an environment variable, e.g.
//! `OLLAMA_BASE_URL` or `DOCCHAT_MODEL`.

pub mod app;
pub mod cli;
pub mod repl;

pub use cli::{Cli, Command, EmbedderKind, GlobalArgs};
