//! assessforge-core — Question model, document building, and import.
//!
//! This crate defines the authoring data model, the multi-step authoring
//! state machine, resource grouping and the document format, plus the
//! collaborator traits that the rest of the assessforge system implements.

pub mod document;
pub mod draft;
pub mod error;
pub mod grouping;
pub mod import;
pub mod model;
pub mod publish;
pub mod reference;
pub mod traits;
pub mod upload;
pub mod wizard;
