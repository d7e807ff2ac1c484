//! # Focusia
//!
//! A retrieval-augmented focus coach. A short description of what is
//! breaking someone's focus goes in; three concrete suggestions and a
//! micro-exercise, grounded in a curated tip corpus, come out.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │ focus_tips   │──▶│ normalize +   │──▶│ index.sqlite │
//! │ .json        │   │ embed         │   │ (persisted)  │
//! └──────────────┘   └───────────────┘   └──────┬───────┘
//!                                               │ load
//!                     ┌─────────────────────────▼──────┐
//!   query ──────────▶ │ Pipeline: MMR retrieve ─▶ HF   │ ──▶ {text, sources}
//!                     │ chat/completion ─▶ clean       │
//!                     └────────────────────────────────┘
//!                          ▲                   ▲
//!                     ┌────┴─────┐       ┌─────┴────┐
//!                     │   CLI    │       │   HTTP   │
//!                     └──────────┘       └──────────┘
//! ```
//!
//! The pure logic (normalization, MMR, prompts, the generation adapter,
//! postprocessing) lives in `focusia-core`; this crate adds configuration,
//! persistence, network providers, and the two front ends.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`logging`] | tracing subscriber setup |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Index schema |
//! | [`embedding`] | OpenAI, Ollama, and local embedding providers |
//! | [`index`] | Build-or-load of the persisted index |
//! | [`hf`] | Hugging Face Inference generation backend |
//! | [`runtime`] | Pipeline construction |
//! | [`ask`] | `focusia ask` |
//! | [`index_cmd`] | `focusia index` |
//! | [`server`] | JSON HTTP server |

pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod hf;
pub mod index;
pub mod index_cmd;
pub mod logging;
pub mod migrate;
pub mod runtime;
pub mod server;
