//! # flowsync-flow
//!
//! Turns a single flow document into a directory of editable files and back.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use flowsync_core::{DefaultTs, StructuredFormat};
//! use flowsync_flow::expand_flow;
//!
//! fn list_files(raw: &str) {
//!     if let Ok(expanded) = expand_flow(raw, StructuredFormat::Yaml, DefaultTs::Bun) {
//!         for script in &expanded.scripts {
//!             println!("{}: {} bytes", script.path, script.content.len());
//!         }
//!         println!("{}", expanded.document_name);
//!     }
//! }
//! ```

pub mod error;
pub mod expand;
pub mod format;
pub mod language;
pub mod model;
pub mod script;

pub use error::FlowError;
pub use expand::{
    expand_flow, extract_inline_scripts, recombine_flow, ExpandedFlow, InlineScript, PathAssigner,
    INLINE_PREFIX,
};
pub use format::{parse_structured, to_structured_text};
pub use language::{extension_for, language_for_path, script_base};
pub use model::{FlowModule, ModuleKind, ModuleValue, OpenFlow, RawScript};
