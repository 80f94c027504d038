//! Phishsim: phishing-simulation campaign orchestration.
//!
//! Turns a recipient directory plus a topic/prompt configuration into
//! per-recipient campaigns on a phishing-simulation backend, and follows up
//! with anyone who clicked.

pub mod backend;
pub mod campaign;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod feedback;
pub mod llm;
pub mod scheduler;
pub mod select;
