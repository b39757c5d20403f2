//! # Sidekick
//!
//! A local-first personal agent runtime. Sidekick turns a free-text
//! request into a plan of tool invocations, decides whether the plan may
//! run unattended, executes it step by step with result chaining, and
//! narrates the outcome — backed by a SQLite retrieval store for
//! long-term context.
//!
//! ## Architecture
//!
//! ```text
//! request
//!    │
//!    ▼
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌──────┐   ┌──────────┐
//! │  Intent   │──▶│  Context  │──▶│   Plan    │──▶│ Gate │──▶│   Step   │
//! │ Detector  │   │ Assembler │   │ Generator │   └──────┘   │ Executor │
//! └──────────┘   └─────┬─────┘   └─────┬─────┘              └────┬─────┘
//!                      │               │                         │
//!                      ▼               ▼                         ▼
//!                ┌──────────┐   ┌───────────┐             ┌───────────┐
//!                │ Retrieval │   │ Reasoner  │             │   Tool    │
//!                │   Store   │   │  (LLM)    │             │  Clients  │
//!                └──────────┘   └───────────┘             └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sk init                          # create database
//! sk add knowledge facts.md        # ingest a document
//! sk query knowledge "birthday"    # similarity search
//! sk ask "search for rust news"    # run the full agent loop
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction + vector math |
//! | [`store`] | Retrieval store (documents, chunks, similarity search) |
//! | [`memory`] | Conversation log |
//! | [`intent`] | Pattern-based intent detection |
//! | [`reasoning`] | Language-model provider abstraction |
//! | [`plan`] | Plan generation and tiered JSON parsing |
//! | [`action`] | Closed action vocabulary |
//! | [`gate`] | Sensitivity gate |
//! | [`tools`] | Tool client seam + built-in knowledge/memory tools |
//! | [`executor`] | Sequential step execution with `$previous` chaining |
//! | [`context`] | Context block assembly |
//! | [`orchestrator`] | The request loop |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`stats`] | Database statistics |

pub mod action;
pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod executor;
pub mod gate;
pub mod intent;
pub mod memory;
pub mod migrate;
pub mod models;
pub mod orchestrator;
pub mod plan;
pub mod reasoning;
pub mod stats;
pub mod store;
pub mod tools;
