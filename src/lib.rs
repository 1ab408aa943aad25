//! # Prodigy Remote In Protocol Engine
//!
//! Server-side engine for the SpecsLab Prodigy "Remote In" device-control
//! protocol (v1.2), together with the client contract that test harnesses
//! and tools rely on. The engine simulates an electron energy analyzer: it
//! speaks the line-oriented request/response grammar over TCP, walks each
//! connection through the define/validate/start/poll/read/clear acquisition
//! workflow, and produces self-consistent synthetic spectra.
//!
//! ## Crate Structure
//!
//! - **`protocol`**: the frame grammar, command vocabulary, error tags and
//!   the line codec.
//! - **`analyzer`**: the device parameter table, spectrum parameter
//!   validation and the time-driven acquisition simulator.
//! - **`session`**: the per-connection state machine dispatching commands
//!   to the analyzer components.
//! - **`network`**: the TCP dispatcher running one session per connection,
//!   and the async client.
//! - **`config`**: TOML settings covering the listener, the analyzer
//!   identity and the parameter table.
//! - **`clock`**: injectable time source keeping every time-driven
//!   transition deterministic under test.
//! - **`error`**: the crate-level error type.

pub mod analyzer;
pub mod clock;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod session;
