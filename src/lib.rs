#![doc = include_str!("../README.md")]

/// The `mapper` module provides functionality for memory mapping files into memory.
pub mod mapper;

/// The `reader` module provides bounds-checked reads over the raw dump bytes.
pub mod reader;

/// The `data` module defines the on-disk record layouts and constants used in minidump parsing.
pub mod data;

/// The `error` module defines error types used throughout the library.
pub mod error;

/// The `context` module decodes saved thread register state.
pub mod context;

/// The `parse` module contains the core logic for parsing minidump files.
pub mod parse;
pub use parse::*;

/// The `status` module maps NT status codes to names and descriptions.
pub mod status;

/// The `classify` module categorizes modules for blame analysis.
pub mod classify;

/// The `walker` module reconstructs the faulting thread's call stack.
pub mod walker;

/// The `analyze` module derives a blame verdict and summary from a parsed dump.
pub mod analyze;
pub use analyze::{AnalysisConfidence, Blame, BlameReason, CrashAnalysis, CrashSummary, analyze};

pub use error::CrashDmpError;

#[cfg(test)]
pub(crate) mod tests_support {
    use crate::data::MINIDUMP_SIGNATURE;

    /// A valid 32-byte dump: magic, version words, zero streams, directory
    /// at offset 32.
    pub fn minimal_dump_bytes() -> Vec<u8> {
        let mut bytes = Vec::with_capacity(32);
        bytes.extend_from_slice(&MINIDUMP_SIGNATURE.to_le_bytes());
        bytes.extend_from_slice(&0xA793u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes
    }
}
