//! # shotflow
//!
//! The engine behind a product-image-generation client. A user uploads
//! product photos, picks a style, waits for generation, tweaks the results
//! and downloads them:
//!
//! ```text
//! Upload → Style → Generate → Edit → Download
//! ```
//!
//! Any stage but Upload can step back to the one before it, and Edit or
//! Download can send the session back to Generate for a fresh run.
//!
//! This crate holds everything about that flow that is more than
//! request/response glue: the stage machine, the simulated generation job,
//! the viewer's transform math, non-destructive adjustments, and selection
//! handling. Image processing and inference are external services that
//! return URLs; the core only moves references around.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`workflow`] | Stage machine and session owner ([`workflow::WorkflowController`]) |
//! | [`job`] | [`job::JobSource`] contract and the timed generation simulator |
//! | [`viewer`] | Zoom / rotation / pan as pure transforms, artifact navigation |
//! | [`adjust`] | Brightness / contrast / saturation / sharpness → render descriptor |
//! | [`selection`] | Index selection for favorites and download batches |
//! | [`style`] | The four style facets and their catalog |
//! | [`types`] | Types shared with the upload, generation and export collaborators |
//! | [`config`] | `shotflow.toml` loading, merging and validation |
//! | [`upload`] | Directory scanner standing in for the upload service |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## A closed stage machine
//!
//! Stages are an enum and every operation is checked against a single pure
//! transition table ([`workflow::transition`]). A rejected call returns an
//! error and changes nothing, so a presentation layer can always re-render
//! the current stage and let the user retry.
//!
//! ## Jobs behind a trait
//!
//! The controller only sees [`job::JobSource`]: start, poll, cancel. The
//! bundled [`job::SimulatedJobSource`] advances one named step per clock
//! interval; a real backend drops in without touching the controller.
//! Progress is capped at 95% until the job has actually produced its
//! artifacts.
//!
//! ## Values, not widgets
//!
//! Viewer state is a `Copy` value and each transform returns a new one.
//! Adjustments never modify an artifact; they describe how to draw it.
//! Both are testable without a screen.

pub mod adjust;
pub mod config;
pub mod job;
pub mod output;
pub mod selection;
pub mod style;
pub mod types;
pub mod upload;
pub mod viewer;
pub mod workflow;
