// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage handler implementations.
//!
//! # Available Backends
//!
//! ## Local Backend
//! In-process stub handlers for the six document stages. They mint and
//! carry identifiers (`document_id` and the per-stage correlation ids) but
//! do no document work.
//!
//! ## Stub Backend (Test-Only)
//! - **RecordingHandler**: captures inputs, returns a fixed output
//! - **FailingHandler**: fails always, or a set number of times
//! - **SlowHandler**: sleeps before answering
//!
//! # Example
//! ```rust
//! use stitch_pipeline::backends::local::LocalHandlerFactory;
//! use stitch_pipeline::traits::StageHandler;
//!
//! let handler = LocalHandlerFactory::create_handler("document_summary")?;
//! assert_eq!(handler.name(), "document_summary");
//! # Ok::<(), String>(())
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
