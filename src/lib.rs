//! A cross-stage shader interface linker.
//!
//! Reconciles the input/output/uniform variable sets of independently
//! compiled shader stages into one consistent program image: varyings no
//! later stage consumes are demoted out of the interface, uniforms receive
//! stable storage locations (explicit placement preserved, implicit ones
//! packed behind them), and the result is exposed as a deduplicated,
//! query-ordered resource table.
//!
//! The linker consumes a frozen per-stage IR ([`ir::StageModule`]) and only
//! annotates it; instruction-level optimization, register allocation, and
//! code generation are other components' business. One link call is
//! single-threaded and run-to-completion; all tables live on the
//! [`program::ShaderProgram`] being linked and are rebuilt on every link.

pub mod ir;
pub mod linker;
pub mod newtypes;
pub mod program;
pub mod resources;
pub mod uniforms;
pub mod varyings;

pub use linker::{link_program, LinkError};
