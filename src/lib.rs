// THEORY:
// This file is the main entry point for the `edge_vision` library crate.
// It exports the `EdgePipeline` and its associated data structures
// (`PipelineConfig`, `EdgeReport`, etc.) as the high-level interface of the
// engine, plus the batch runner and the config loader used by the binary.
// The individual stages live in `core_modules` and can be driven one at a
// time when a caller needs the intermediate buffers.

pub mod config;
pub mod core_modules;
pub mod parallel_pipeline;
pub mod pipeline;
