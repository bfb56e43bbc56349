//! End-to-end pipeline from raw match rows to a modeling table

pub mod assembler;

pub use assembler::{split, FeatureAssembler, InputSummary, ModelingTable};
