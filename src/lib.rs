//! # ShellAI
//!
//! Natural-language system diagnostics: collect system information with
//! shell commands, index it with a local Ollama instance, and query it in
//! plain English.
//!
//! ## Pipeline
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌───────────────┐   ┌─────────┐
//! │ Diagnostic │──▶│ .txt files │──▶│ Persisted idx │──▶│  Query  │
//! │  commands  │   │ (collect)  │   │ (3 companion  │   │ (Ollama)│
//! └───────────┘   └────────────┘   │  JSON files)  │   └─────────┘
//!                                  └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! shellai collect                  # run the diagnostic catalog
//! shellai ask                      # interactive Q&A session
//! shellai ask --question "how much disk space is free?"
//! shellai refresh                  # force an index rebuild
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | YAML configuration loading and persistence |
//! | [`runner`] | Shell command execution with timeout |
//! | [`collect`] | Diagnostic artifact collection |
//! | [`chunk`] | Line-boundary text chunking |
//! | [`ollama`] | Ollama HTTP client (embed, generate, tags) |
//! | [`index`] | Persisted vector index lifecycle |
//! | [`query`] | Question answering and the interactive session |
//! | [`status`] | Artifact and index status overview |
//! | [`cleanup`] | Guarded artifact deletion |
//! | [`setup`] | Environment check |

pub mod chunk;
pub mod cleanup;
pub mod collect;
pub mod config;
pub mod index;
pub mod ollama;
pub mod query;
pub mod runner;
pub mod setup;
pub mod status;
