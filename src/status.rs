//! NT status code lookup.
//!
//! A fixed table mapping the exception codes a crash dump commonly carries
//! to their symbolic names and descriptions, plus severity extraction from
//! the top two bits of the code.

/// Exception code for an access violation.
pub const EXCEPTION_ACCESS_VIOLATION: u32 = 0xC000_0005;

/// Exception code for a stack overflow.
pub const EXCEPTION_STACK_OVERFLOW: u32 = 0xC000_00FD;

/// Exception code for an integer division by zero.
pub const EXCEPTION_INT_DIVIDE_BY_ZERO: u32 = 0xC000_0094;

/// Exception code for a /GS security check failure.
pub const EXCEPTION_STACK_BUFFER_OVERRUN: u32 = 0xC000_0409;

/// Exception code used by the Microsoft C++ runtime for thrown objects.
pub const EXCEPTION_MSVC_CPP: u32 = 0xE06D_7363;

/// Severity of an NT status code, from bits 31..30.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Success,
    Informational,
    Warning,
    Error,
}

/// Returns the severity encoded in bits 31..30 of `code`.
pub fn severity(code: u32) -> Severity {
    match code >> 30 {
        0 => Severity::Success,
        1 => Severity::Informational,
        2 => Severity::Warning,
        _ => Severity::Error,
    }
}

/// Returns true when `code` carries error severity.
pub fn is_error(code: u32) -> bool {
    severity(code) == Severity::Error
}

/// Returns the symbolic name for `code`, or the `0x…` hex form for codes
/// outside the table.
pub fn name(code: u32) -> String {
    match lookup(code) {
        Some((name, _)) => name.to_string(),
        None => format!("0x{code:08X}"),
    }
}

/// Returns the description for `code`.
pub fn description(code: u32) -> &'static str {
    match lookup(code) {
        Some((_, description)) => description,
        None => "Unknown exception code.",
    }
}

/// Looks up `code` in the status table.
pub fn lookup(code: u32) -> Option<(&'static str, &'static str)> {
    TABLE
        .binary_search_by_key(&code, |&(code, _, _)| code)
        .ok()
        .map(|index| {
            let (_, name, description) = TABLE[index];
            (name, description)
        })
}

// Sorted by code; names and descriptions per the Microsoft reference.
static TABLE: &[(u32, &str, &str)] = &[
    (0x0000_0000, "STATUS_SUCCESS", "The operation completed successfully."),
    (0x0000_0102, "STATUS_TIMEOUT", "The wait operation timed out."),
    (
        0x0000_0103,
        "STATUS_PENDING",
        "The operation that was requested is pending completion.",
    ),
    (
        0x4000_0000,
        "STATUS_OBJECT_NAME_EXISTS",
        "An attempt was made to create an object but the object name already existed.",
    ),
    (
        0x4000_0015,
        "STATUS_FATAL_APP_EXIT",
        "The application caused an unhandled fatal exit.",
    ),
    (
        0x4001_0005,
        "DBG_CONTROL_C",
        "A CTRL+C interrupt was received by the debugger.",
    ),
    (
        0x4001_0008,
        "DBG_CONTROL_BREAK",
        "A CTRL+BREAK interrupt was received by the debugger.",
    ),
    (
        0x8000_0001,
        "STATUS_GUARD_PAGE_VIOLATION",
        "A page of memory that marks the end of a data structure was accessed.",
    ),
    (
        0x8000_0002,
        "STATUS_DATATYPE_MISALIGNMENT",
        "A datatype misalignment was detected in a load or store instruction.",
    ),
    (0x8000_0003, "STATUS_BREAKPOINT", "A breakpoint was reached."),
    (
        0x8000_0004,
        "STATUS_SINGLE_STEP",
        "A single step or trace operation has just been completed.",
    ),
    (
        0x8000_0005,
        "STATUS_BUFFER_OVERFLOW",
        "The data was too large to fit into the specified buffer.",
    ),
    (0x8000_0026, "STATUS_LONGJUMP", "A long jump has been executed."),
    (
        0x8000_0029,
        "STATUS_UNWIND_CONSOLIDATE",
        "A frame consolidation has been executed.",
    ),
    (
        0xC000_0001,
        "STATUS_UNSUCCESSFUL",
        "The requested operation was unsuccessful.",
    ),
    (
        0xC000_0002,
        "STATUS_NOT_IMPLEMENTED",
        "The requested operation is not implemented.",
    ),
    (
        0xC000_0005,
        "STATUS_ACCESS_VIOLATION",
        "The thread tried to read from or write to a virtual address for which it does not have the appropriate access.",
    ),
    (
        0xC000_0006,
        "STATUS_IN_PAGE_ERROR",
        "The required data was not placed into memory because of an I/O error.",
    ),
    (0xC000_0008, "STATUS_INVALID_HANDLE", "An invalid HANDLE was specified."),
    (
        0xC000_000D,
        "STATUS_INVALID_PARAMETER",
        "An invalid parameter was passed to a service or function.",
    ),
    (
        0xC000_0017,
        "STATUS_NO_MEMORY",
        "Not enough virtual memory or paging file quota is available to complete the specified operation.",
    ),
    (
        0xC000_001D,
        "STATUS_ILLEGAL_INSTRUCTION",
        "An attempt was made to execute an illegal instruction.",
    ),
    (
        0xC000_0022,
        "STATUS_ACCESS_DENIED",
        "A process has requested access to an object but has not been granted those access rights.",
    ),
    (
        0xC000_0025,
        "STATUS_NONCONTINUABLE_EXCEPTION",
        "Windows cannot continue from this exception.",
    ),
    (0xC000_006D, "STATUS_LOGON_FAILURE", "The attempted logon is invalid."),
    (
        0xC000_007B,
        "STATUS_INVALID_IMAGE_FORMAT",
        "The specified image file did not have the correct format.",
    ),
    (
        0xC000_008C,
        "STATUS_ARRAY_BOUNDS_EXCEEDED",
        "An array bounds check failed: the index was outside the bounds of the array.",
    ),
    (
        0xC000_008D,
        "STATUS_FLOAT_DENORMAL_OPERAND",
        "A floating-point operation used a denormal operand.",
    ),
    (
        0xC000_008E,
        "STATUS_FLOAT_DIVIDE_BY_ZERO",
        "A floating-point operation attempted to divide by zero.",
    ),
    (
        0xC000_008F,
        "STATUS_FLOAT_INEXACT_RESULT",
        "A floating-point operation produced a result that cannot be represented exactly.",
    ),
    (
        0xC000_0090,
        "STATUS_FLOAT_INVALID_OPERATION",
        "A floating-point operation was invalid.",
    ),
    (
        0xC000_0091,
        "STATUS_FLOAT_OVERFLOW",
        "A floating-point operation overflowed.",
    ),
    (
        0xC000_0092,
        "STATUS_FLOAT_STACK_CHECK",
        "The stack overflowed or underflowed as a result of a floating-point operation.",
    ),
    (
        0xC000_0093,
        "STATUS_FLOAT_UNDERFLOW",
        "A floating-point operation underflowed.",
    ),
    (
        0xC000_0094,
        "STATUS_INTEGER_DIVIDE_BY_ZERO",
        "An integer operation attempted to divide by zero.",
    ),
    (
        0xC000_0095,
        "STATUS_INTEGER_OVERFLOW",
        "An integer operation overflowed.",
    ),
    (
        0xC000_0096,
        "STATUS_PRIVILEGED_INSTRUCTION",
        "An attempt was made to execute a privileged instruction.",
    ),
    (
        0xC000_00FD,
        "STATUS_STACK_OVERFLOW",
        "A new guard page for the stack cannot be created.",
    ),
    (
        0xC000_0135,
        "STATUS_DLL_NOT_FOUND",
        "The code execution cannot proceed because a required DLL was not found.",
    ),
    (
        0xC000_0138,
        "STATUS_ORDINAL_NOT_FOUND",
        "An ordinal could not be located in a dynamic link library.",
    ),
    (
        0xC000_0139,
        "STATUS_ENTRYPOINT_NOT_FOUND",
        "A procedure entry point could not be located in a dynamic link library.",
    ),
    (
        0xC000_013A,
        "STATUS_CONTROL_C_EXIT",
        "The application terminated as a result of a CTRL+C.",
    ),
    (
        0xC000_0142,
        "STATUS_DLL_INIT_FAILED",
        "Initialization of a dynamic link library failed; the process is terminating abnormally.",
    ),
    (
        0xC000_0144,
        "STATUS_UNHANDLED_EXCEPTION",
        "An unhandled exception was encountered.",
    ),
    (
        0xC000_0194,
        "STATUS_POSSIBLE_DEADLOCK",
        "A possible deadlock condition was detected.",
    ),
    (0xC000_0374, "STATUS_HEAP_CORRUPTION", "A heap has been corrupted."),
    (
        0xC000_0409,
        "STATUS_STACK_BUFFER_OVERRUN",
        "The system detected an overrun of a stack-based buffer in this application.",
    ),
    (
        0xC000_0417,
        "STATUS_INVALID_CRUNTIME_PARAMETER",
        "An invalid parameter was passed to a C runtime function.",
    ),
    (
        0xC000_0420,
        "STATUS_ASSERTION_FAILURE",
        "An assertion failure has occurred.",
    ),
    (
        0xC000_0602,
        "STATUS_FAIL_FAST_EXCEPTION",
        "A fail fast exception occurred; exception handlers will not be invoked.",
    ),
    (
        0xC002_0001,
        "RPC_NT_INVALID_STRING_BINDING",
        "The string binding is invalid.",
    ),
    (
        0xC002_0047,
        "RPC_NT_CALL_CANCELLED",
        "The remote procedure call was cancelled.",
    ),
    (
        0xE043_4352,
        "CLR_EXCEPTION",
        "An unhandled .NET common language runtime exception was thrown.",
    ),
    (
        0xE043_4F4D,
        "COMPLUS_EXCEPTION",
        "An unhandled COM+ exception was thrown.",
    ),
    (
        0xE06D_7363,
        "MSVC_CPP_EXCEPTION",
        "An unhandled Microsoft C++ exception was thrown.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_by_code() {
        for window in TABLE.windows(2) {
            assert!(window[0].0 < window[1].0, "table out of order at {:#x}", window[1].0);
        }
    }

    #[test]
    fn known_codes_resolve_to_symbolic_names() {
        assert_eq!(name(0xC000_0005), "STATUS_ACCESS_VIOLATION");
        assert_eq!(name(0x0000_0000), "STATUS_SUCCESS");
        assert_eq!(name(0xE06D_7363), "MSVC_CPP_EXCEPTION");
        assert!(!name(0xC000_0374).starts_with("0x"));
    }

    #[test]
    fn unknown_codes_get_hex_placeholder() {
        assert_eq!(name(0xC0FF_EE00), "0xC0FFEE00");
        assert_eq!(description(0xC0FF_EE00), "Unknown exception code.");
    }

    #[test]
    fn severity_is_the_top_two_bits() {
        assert_eq!(severity(0x0000_0102), Severity::Success);
        assert_eq!(severity(0x4001_0005), Severity::Informational);
        assert_eq!(severity(0x8000_0003), Severity::Warning);
        assert_eq!(severity(0xC000_0005), Severity::Error);
        assert!(is_error(0xE06D_7363));
        assert!(!is_error(0x8000_0005));
    }
}
