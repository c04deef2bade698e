use binrw::Error as BinrwError;
use thiserror::Error;

/// Represents errors that may occur during the processing of a minidump file.
///
/// Only three variants describe a fatal problem with the dump itself
/// ([`InvalidSignature`], [`InvalidHeader`], [`InvalidStreamDirectory`]);
/// every stream- or record-level failure is recorded as an absent field on
/// the parsed dump instead of being surfaced through this type.
///
/// [`InvalidSignature`]: CrashDmpError::InvalidSignature
/// [`InvalidHeader`]: CrashDmpError::InvalidHeader
/// [`InvalidStreamDirectory`]: CrashDmpError::InvalidStreamDirectory
#[derive(Debug, Error)]
pub enum CrashDmpError {
    /// Raised when the application fails to open a file.
    ///
    /// # Arguments
    ///
    /// * `{0}` - The underlying `std::io::Error` providing details about the failure.
    #[error("Failed to open file: {0}")]
    FileOpenError(#[from] std::io::Error),

    /// Raised when the file is too short to hold a minidump header or the
    /// signature does not match `MDMP`.
    #[error("Invalid minidump signature.")]
    InvalidSignature,

    /// Raised when the signature matched but the remainder of the 32-byte
    /// header could not be decoded.
    #[error("Invalid minidump header.")]
    InvalidHeader,

    /// Raised when the stream directory could not be decoded: the declared
    /// stream count exceeds its cap, the directory range overflows, or the
    /// directory extends past the end of the file.
    #[error("Invalid minidump stream directory.")]
    InvalidStreamDirectory,

    /// Raised when a stream or record declares a count above its documented
    /// cap. Never surfaced from [`CrashDump::parse`]; the orchestrator
    /// demotes it to an absent stream.
    ///
    /// [`CrashDump::parse`]: crate::CrashDump::parse
    #[error("{0} count {1} exceeds its cap")]
    CountExceedsCap(&'static str, u64),

    /// Raised when a record's offset/size arithmetic leaves the dump blob.
    /// Never surfaced from parsing; demoted to an absent field.
    #[error("Range {rva:#x}..{rva:#x}+{size:#x} is outside the dump")]
    OutOfRange { rva: u64, size: u64 },

    /// Raised when the application fails to map a view of the minidump file.
    #[error("Failed to map view of file.")]
    MmapError,

    /// Raised when a parsing error occurs in the `binrw` library.
    ///
    /// # Arguments
    ///
    /// * `{0}` - The error produced by the `binrw` library.
    #[error("Parsing error: {0}")]
    BinrwError(#[from] BinrwError),
}
