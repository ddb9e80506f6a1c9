//! Training batches from a dataset index.
//!
//! [`flow::IndexFlow`] walks a [`index::DatasetIndex`] split in fixed-size batches, loading
//! images and rendering pose conditioning for each sample; [`prefetch::Prefetch`] keeps one batch
//! in flight on a worker thread. [`preprocess`] holds the array conversions shared by both and by
//! the CLI.

/// Index-driven batch iteration.
pub mod flow;
/// Dataset index document.
pub mod index;
/// Image decoding and PNG output.
pub mod io;
/// Single-slot background batch fetching.
pub mod prefetch;
/// `u8`/`f32` conversions and batch tiling.
pub mod preprocess;
