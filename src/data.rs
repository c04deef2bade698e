#![allow(non_snake_case, non_camel_case_types)]

/// Maximum number of parameters associated with an exception.
pub const EXCEPTION_MAXIMUM_PARAMETERS: usize = 15;

/// Signature to identify Minidump files ("MDMP" in ASCII).
pub const MINIDUMP_SIGNATURE: u32 = 0x504D_444D;

/// Signature of a valid [`VS_FIXEDFILEINFO`] record.
pub const VS_FFI_SIGNATURE: u32 = 0xFEEF_04BD;

/// CodeView PDB 7.0 signature (`"RSDS"` little-endian).
pub const CV_SIGNATURE_RSDS: u32 = 0x5344_5352;

/// CodeView PDB 2.0 signature (`"NB10"` little-endian).
pub const CV_SIGNATURE_NB10: u32 = 0x3031_424E;

/// Byte size of a serialized AMD64 `CONTEXT` record.
pub const CONTEXT_AMD64_SIZE: u32 = 1232;

/// Byte size of a serialized x86 `CONTEXT` record.
pub const CONTEXT_X86_SIZE: u32 = 716;

/// `ContextFlags` bit indicating the FXSAVE area (and thus XMM0..15) is valid.
pub const CONTEXT_HAS_FLOATING_POINT: u32 = 0x8;

// Decoding caps. A count above its cap fails that stream, never the dump;
// the directory cap is the one exception and rejects the whole file.
pub const MAX_STREAM_COUNT: u32 = 1_000;
pub const MAX_THREAD_COUNT: u32 = 10_000;
pub const MAX_MODULE_COUNT: u32 = 50_000;
pub const MAX_UNLOADED_MODULE_COUNT: u32 = 10_000;
pub const MAX_HANDLE_COUNT: u32 = 100_000;
pub const MAX_MEMORY64_RANGE_COUNT: u64 = 100_000;
pub const MAX_MEMORY_RANGE_COUNT: u32 = 100_000;
pub const MAX_MEMORY_INFO_COUNT: u64 = 1_000_000;
pub const MAX_THREAD_NAME_COUNT: u32 = 50_000;

// MINIDUMP_MISC_INFO flag bits gating which fields are present.
pub const MISC1_PROCESS_ID: u32 = 0x1;
pub const MISC1_PROCESS_TIMES: u32 = 0x2;
pub const MISC1_PROCESSOR_POWER_INFO: u32 = 0x4;
pub const MISC3_PROCESS_INTEGRITY: u32 = 0x10;
pub const MISC3_PROCESS_EXECUTE_FLAGS: u32 = 0x20;
pub const MISC3_TIMEZONE: u32 = 0x40;
pub const MISC3_PROTECTED_PROCESS: u32 = 0x80;
pub const MISC4_BUILDSTRING: u32 = 0x100;

/// Contains header information for the minidump file.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_header).
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_HEADER {
    /// The signature.
    pub Signature: u32,

    /// The version of the minidump format.
    pub Version: u16,

    /// The internal implementation version of the writer.
    pub ImplementationVersion: u16,

    /// The number of streams in the minidump directory.
    pub NumberOfStreams: u32,

    /// The base RVA of the minidump directory.
    pub StreamDirectoryRva: u32,

    /// The checksum for the minidump file.
    pub CheckSum: u32,

    // Time and date, in time_t format.
    pub TimeDateStamp: u32,

    /// One or more values from the MINIDUMP_TYPE enumeration type.
    pub Flags: u64,
}

/// Contains the information needed to access a specific data stream in a minidump file.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_directory).
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_DIRECTORY {
    /// The type of data stream.
    pub StreamType: u32,

    /// A [`MINIDUMP_LOCATION_DESCRIPTOR`] structure that specifies the location of the data stream.
    pub Location: MINIDUMP_LOCATION_DESCRIPTOR,
}

/// Contains information describing the location of a data stream within a minidump file.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_location_descriptor)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_LOCATION_DESCRIPTOR {
    /// The size of the data stream, in bytes.
    pub DataSize: u32,

    /// The relative virtual address (RVA) of the data.
    pub RVA: u32,
}

/// Describes a range of memory.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_memory_descriptor)
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_MEMORY_DESCRIPTOR {
    /// The starting address of the memory range.
    pub StartOfMemoryRange: u64,

    /// A MINIDUMP_LOCATION_DESCRIPTOR structure.
    pub Memory: MINIDUMP_LOCATION_DESCRIPTOR,
}

/// Describes a range of memory in a [`MINIDUMP_MEMORY64_LIST`].
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_memory_descriptor).
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_MEMORY_DESCRIPTOR64 {
    /// The starting address of the memory range.
    pub StartOfMemoryRange: u64,

    /// The size of the memory range, in bytes.
    pub DataSize: u64,
}

/// Contains a list of memory ranges captured with full 64-bit addresses.
///
/// The file offset of range *k* is `BaseRva` plus the sizes of all ranges
/// before it; the accumulation is performed by the parser with overflow
/// checks.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_memory64_list).
#[derive(Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_MEMORY64_LIST {
    /// The number of structures in the MemoryRanges array.
    #[br(assert(NumberOfMemoryRanges <= MAX_MEMORY64_RANGE_COUNT))]
    pub NumberOfMemoryRanges: u64,

    /// The RVA where the contiguous region contents begin.
    pub BaseRva: u64,

    /// Memory descriptors.
    #[br(count = NumberOfMemoryRanges)]
    pub Ranges: Vec<MINIDUMP_MEMORY_DESCRIPTOR64>,
}

/// Contains a list of memory ranges with per-range location descriptors.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_memory_list).
#[derive(Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_MEMORY_LIST {
    /// The number of structures in the MemoryRanges array.
    #[br(assert(NumberOfMemoryRanges <= MAX_MEMORY_RANGE_COUNT))]
    pub NumberOfMemoryRanges: u32,

    /// An array of MINIDUMP_MEMORY_DESCRIPTOR structures.
    #[br(count = NumberOfMemoryRanges)]
    pub MemoryRanges: Vec<MINIDUMP_MEMORY_DESCRIPTOR>,
}

/// Header of the `MemoryInfoListStream`. Entries follow at `SizeOfHeader`
/// with a stride of `SizeOfEntry` and are decoded one by one by the parser.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_memory_info_list).
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_MEMORY_INFO_LIST {
    /// Size of the header for this structure.
    pub SizeOfHeader: u32,

    /// Size of each entry in the memory info list.
    pub SizeOfEntry: u32,

    /// Number of entries in the memory info list.
    #[br(assert(NumberOfEntries <= MAX_MEMORY_INFO_COUNT))]
    pub NumberOfEntries: u64,
}

/// Describes a region of memory.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_memory_info).
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_MEMORY_INFO {
    /// The base address of the memory region.
    pub BaseAddress: u64,

    /// The base address of the allocation containing the memory region.
    pub AllocationBase: u64,

    /// The memory protection applied at the time of allocation.
    pub AllocationProtect: u32,

    /// Alignment padding (unused).
    pub alignment1: u32,

    /// The size of the memory region in bytes.
    pub RegionSize: u64,

    /// The state of the memory region (e.g., committed, free, reserved).
    pub State: u32,

    /// The protection level of the memory region.
    pub Protect: u32,

    /// The type of memory region (e.g., private, mapped, image).
    pub Type: u32,

    /// Alignment padding (unused).
    pub alignment2: u32,
}

/// Contains processor and operating system information.
///
/// The trailing 24 bytes are a union keyed on `ProcessorArchitecture`; they
/// are kept raw here and decoded by the parser.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_system_info)
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_SYSTEM_INFO {
    /// The system's processor architecture.
    pub ProcessorArchitecture: u16,

    /// The system's architecture-dependent processor level.
    pub ProcessorLevel: u16,

    /// The architecture-dependent processor revision.
    pub ProcessorRevision: u16,

    /// The number of processors in the system.
    pub NumberOfProcessors: u8,

    /// Any additional information about the system.
    pub ProductType: u8,

    /// The major version number of the operating system.
    pub MajorVersion: u32,

    /// The minor version number of the operating system.
    pub MinorVersion: u32,

    /// The build number of the operating system.
    pub BuildNumber: u32,

    /// The operating system platform.
    pub PlatformId: u32,

    /// An RVA (from the beginning of the dump) to a MINIDUMP_STRING that describes the latest Service Pack installed on the system.
    pub CSDVersionRva: u32,

    /// The bit flags that identify the product suites available on the system.
    pub SuiteMask: u16,

    /// This member is reserved for future use.
    pub Reserved2: u16,

    /// The CPU information union, raw.
    pub Cpu: [u8; 24],
}

/// Represents an exception information stream.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_exception_stream).
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_EXCEPTION_STREAM {
    /// The identifier of the thread that caused the exception.
    pub ThreadId: u32,

    /// A variable for alignment.
    pub alignment: u32,

    /// A MINIDUMP_EXCEPTION structure.
    pub ExceptionRecord: MINIDUMP_EXCEPTION,

    /// A MINIDUMP_LOCATION_DESCRIPTOR structure pointing at the saved thread context.
    pub ThreadContext: MINIDUMP_LOCATION_DESCRIPTOR,
}

/// Represents an exception record.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_exception).
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_EXCEPTION {
    /// The reason the exception occurred.
    pub ExceptionCode: u32,

    /// This member can be either zero, indicating a continuable exception, or EXCEPTION_NONCONTINUABLE, indicating a noncontinuable exception.
    pub ExceptionFlags: u32,

    /// A pointer to an associated MINIDUMP_EXCEPTION structure.
    pub ExceptionRecord: u64,

    /// The address where the exception occurred.
    pub ExceptionAddress: u64,

    /// The number of parameters associated with the exception.
    pub NumberParameters: u32,

    /// Reserved for cross-platform structure member alignment. Do not set
    pub unusedAlignment: u32,

    /// An array of additional arguments that describe the exception.
    pub ExceptionInformation: [u64; EXCEPTION_MAXIMUM_PARAMETERS],
}

/// Contains a list of threads.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_thread_list)
#[derive(Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_THREAD_LIST {
    /// The number of structures in the Threads array.
    #[br(assert(NumberOfThreads <= MAX_THREAD_COUNT))]
    pub NumberOfThreads: u32,

    /// An array of MINIDUMP_THREAD structures.
    #[br(count = NumberOfThreads)]
    pub Threads: Vec<MINIDUMP_THREAD>,
}

/// Contains information for a specific thread.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_thread)
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_THREAD {
    /// The identifier of the thread.
    pub ThreadId: u32,

    /// The suspend count for the thread. If the suspend count is greater than zero, the thread is suspended; otherwise, the thread is not suspended.
    pub SuspendCount: u32,

    /// The priority class of the thread. See Scheduling Priorities.
    pub PriorityClass: u32,

    /// The priority level of the thread.
    pub Priority: u32,

    /// The thread environment block.
    pub Teb: u64,

    /// A MINIDUMP_MEMORY_DESCRIPTOR structure describing the captured stack.
    pub Stack: MINIDUMP_MEMORY_DESCRIPTOR,

    /// A MINIDUMP_LOCATION_DESCRIPTOR structure locating the saved context.
    pub ThreadContext: MINIDUMP_LOCATION_DESCRIPTOR,
}

/// Contains a list of modules.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_module_list)
#[derive(Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_MODULE_LIST {
    /// The number of structures in the Modules array.
    #[br(assert(NumberOfModules <= MAX_MODULE_COUNT))]
    pub NumberOfModules: u32,

    /// An array of MINIDUMP_MODULE structures.
    #[br(count = NumberOfModules)]
    pub Modules: Vec<MINIDUMP_MODULE>,
}

/// Contains information for a specific module.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_module)
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_MODULE {
    /// The base address of the module executable image in memory.
    pub BaseOfImage: u64,

    /// The size of the module executable image in memory, in bytes.
    pub SizeOfImage: u32,

    /// The checksum value of the module executable image.
    pub CheckSum: u32,

    /// The timestamp value of the module executable image, in time_t format.
    pub TimeDateStamp: u32,

    /// An RVA to a MINIDUMP_STRING structure that specifies the name of the module.
    pub ModuleNameRva: u32,

    /// A VS_FIXEDFILEINFO structure that specifies the version of the module.
    pub VersionInfo: VS_FIXEDFILEINFO,

    /// A MINIDUMP_LOCATION_DESCRIPTOR structure that specifies the CodeView record of the module.
    pub CvRecord: MINIDUMP_LOCATION_DESCRIPTOR,

    /// A MINIDUMP_LOCATION_DESCRIPTOR structure that specifies the miscellaneous record of the module.
    pub MiscRecord: MINIDUMP_LOCATION_DESCRIPTOR,

    /// Reserved for future use.
    pub Reserved0: u64,

    /// Reserved for future use.
    pub Reserved1: u64,
}

/// Contains version information for a file.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/verrsrc/ns-verrsrc-vs_fixedfileinfo)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[binrw::binrw]
#[brw(little)]
pub struct VS_FIXEDFILEINFO {
    /// Contains the value 0xFEEF04BD when valid.
    pub dwSignature: u32,

    /// The binary version number of this structure.
    pub dwStrucVersion: u32,

    /// The most significant 32 bits of the file's binary version number.
    pub dwFileVersionMS: u32,

    /// The least significant 32 bits of the file's binary version number.
    pub dwFileVersionLS: u32,

    /// The most significant 32 bits of the binary version number of the product with which this file was distributed.
    pub dwProductVersionMS: u32,

    /// The least significant 32 bits of the binary version number of the product with which this file was distributed.
    pub dwProductVersionLS: u32,

    /// Contains a bitmask that specifies the valid bits in dwFileFlags.
    pub dwFileFlagsMask: u32,

    /// Contains a bitmask that specifies the Boolean attributes of the file.
    pub dwFileFlags: u32,

    /// The operating system for which this file was designed.
    pub dwFileOS: u32,

    /// The general type of file.
    pub dwFileType: u32,

    /// The function of the file.
    pub dwFileSubtype: u32,

    /// The most significant 32 bits of the file's 64-bit binary creation date and time stamp.
    pub dwFileDateMS: u32,

    /// The least significant 32 bits of the file's 64-bit binary creation date and time stamp.
    pub dwFileDateLS: u32,
}

/// Represents the header for a handle data stream. Descriptors follow at
/// `SizeOfHeader` with a stride of `SizeOfDescriptor`.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_handle_data_stream)
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_HANDLE_DATA_STREAM {
    /// The size of the header information for the stream, in bytes.
    pub SizeOfHeader: u32,

    /// The size of a descriptor in the stream, in bytes.
    pub SizeOfDescriptor: u32,

    /// The number of descriptors in the stream.
    #[br(assert(NumberOfDescriptors <= MAX_HANDLE_COUNT))]
    pub NumberOfDescriptors: u32,

    /// Reserved for future use; must be zero.
    pub Reserved: u32,
}

/// Contains the state of an individual system handle at the time the minidump was written.
///
/// The trailing `ObjectInfoRva` exists only in the 40-byte V2 descriptor.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_handle_descriptor)
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little, import(is_v2: bool))]
pub struct MINIDUMP_HANDLE_DESCRIPTOR {
    /// The operating system handle value.
    pub Handle: u64,

    /// An RVA to a MINIDUMP_STRING structure that specifies the object type of the handle.
    pub TypeNameRva: u32,

    /// An RVA to a MINIDUMP_STRING structure that specifies the object name of the handle.
    pub ObjectNameRva: u32,

    /// The meaning of this member depends on the handle type and the operating system.
    pub Attributes: u32,

    /// The meaning of this member depends on the handle type and the operating system.
    pub GrantedAccess: u32,

    /// The meaning of this member depends on the handle type and the operating system.
    pub HandleCount: u32,

    /// The meaning of this member depends on the handle type and the operating system.
    pub PointerCount: u32,

    /// An RVA to a MINIDUMP_HANDLE_OBJECT_INFORMATION structure (V2 only).
    #[br(if(is_v2))]
    pub ObjectInfoRva: Option<u32>,
}

/// Header of the `UnloadedModuleListStream`. Entries follow at
/// `SizeOfHeader` with a stride of `SizeOfEntry`.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_unloaded_module_list)
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_UNLOADED_MODULE_LIST {
    /// The size of the header information for the stream, in bytes.
    pub SizeOfHeader: u32,

    /// The size of each entry in the stream, in bytes.
    pub SizeOfEntry: u32,

    /// The number of entries in the stream.
    #[br(assert(NumberOfEntries <= MAX_UNLOADED_MODULE_COUNT))]
    pub NumberOfEntries: u32,
}

/// Contains information about a module that has been unloaded.
///
/// For more details, see the official [Microsoft documentation](https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ns-minidumpapiset-minidump_unloaded_module)
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_UNLOADED_MODULE {
    /// The base address of the module executable image in memory.
    pub BaseOfImage: u64,

    /// The size of the module executable image in memory, in bytes.
    pub SizeOfImage: u32,

    /// The checksum value of the module executable image.
    pub CheckSum: u32,

    /// The timestamp value of the module executable image, in time_t format.
    pub TimeDateStamp: u32,

    /// An RVA to a MINIDUMP_STRING structure that specifies the name of the module.
    pub ModuleNameRva: u32,
}

/// One entry of the `ThreadNamesStream`.
///
/// The Microsoft definition is naturally 12 bytes; entries are probed at
/// that stride and an over-read ends the walk without failing the stream.
#[derive(Copy, Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct MINIDUMP_THREAD_NAME {
    /// The identifier of the thread.
    pub ThreadId: u32,

    /// An RVA to a MINIDUMP_STRING holding the thread name.
    pub RvaOfThreadName: u64,
}

/// Represents the type of a minidump data stream.
///
/// Unknown values are preserved as `Other` so the directory can surface
/// streams the parser does not decode.
///
/// <https://learn.microsoft.com/en-us/windows/win32/api/minidumpapiset/ne-minidumpapiset-minidump_stream_type>
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MINIDUMP_STREAM_TYPE {
    UnusedStream,
    ReservedStream0,
    ReservedStream1,
    ThreadListStream,
    ModuleListStream,
    MemoryListStream,
    ExceptionStream,
    SystemInfoStream,
    ThreadExListStream,
    Memory64ListStream,
    CommentStreamA,
    CommentStreamW,
    HandleDataStream,
    FunctionTableStream,
    UnloadedModuleListStream,
    MiscInfoStream,
    MemoryInfoListStream,
    ThreadInfoListStream,
    HandleOperationListStream,
    TokenStream,
    JavaScriptDataStream,
    SystemMemoryInfoStream,
    ProcessVmCountersStream,
    IptTraceStream,
    ThreadNamesStream,
    Other(u32),
}

impl From<u32> for MINIDUMP_STREAM_TYPE {
    fn from(value: u32) -> Self {
        match value {
            0 => MINIDUMP_STREAM_TYPE::UnusedStream,
            1 => MINIDUMP_STREAM_TYPE::ReservedStream0,
            2 => MINIDUMP_STREAM_TYPE::ReservedStream1,
            3 => MINIDUMP_STREAM_TYPE::ThreadListStream,
            4 => MINIDUMP_STREAM_TYPE::ModuleListStream,
            5 => MINIDUMP_STREAM_TYPE::MemoryListStream,
            6 => MINIDUMP_STREAM_TYPE::ExceptionStream,
            7 => MINIDUMP_STREAM_TYPE::SystemInfoStream,
            8 => MINIDUMP_STREAM_TYPE::ThreadExListStream,
            9 => MINIDUMP_STREAM_TYPE::Memory64ListStream,
            10 => MINIDUMP_STREAM_TYPE::CommentStreamA,
            11 => MINIDUMP_STREAM_TYPE::CommentStreamW,
            12 => MINIDUMP_STREAM_TYPE::HandleDataStream,
            13 => MINIDUMP_STREAM_TYPE::FunctionTableStream,
            14 => MINIDUMP_STREAM_TYPE::UnloadedModuleListStream,
            15 => MINIDUMP_STREAM_TYPE::MiscInfoStream,
            16 => MINIDUMP_STREAM_TYPE::MemoryInfoListStream,
            17 => MINIDUMP_STREAM_TYPE::ThreadInfoListStream,
            18 => MINIDUMP_STREAM_TYPE::HandleOperationListStream,
            19 => MINIDUMP_STREAM_TYPE::TokenStream,
            20 => MINIDUMP_STREAM_TYPE::JavaScriptDataStream,
            21 => MINIDUMP_STREAM_TYPE::SystemMemoryInfoStream,
            22 => MINIDUMP_STREAM_TYPE::ProcessVmCountersStream,
            23 => MINIDUMP_STREAM_TYPE::IptTraceStream,
            24 => MINIDUMP_STREAM_TYPE::ThreadNamesStream,
            other => MINIDUMP_STREAM_TYPE::Other(other),
        }
    }
}

/// CONTEXT structure representing 64 bits.
///
/// Serialized size is [`CONTEXT_AMD64_SIZE`] bytes; `ContextFlags` sits at
/// offset 48, the GPRs at 120, `Rip` at 248 and the FXSAVE area at 256.
#[derive(Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct CONTEXT_AMD64 {
    pub P1Home: u64,
    pub P2Home: u64,
    pub P3Home: u64,
    pub P4Home: u64,
    pub P5Home: u64,
    pub P6Home: u64,
    pub ContextFlags: u32,
    pub MxCsr: u32,
    pub SegCs: u16,
    pub SegDs: u16,
    pub SegEs: u16,
    pub SegFs: u16,
    pub SegGs: u16,
    pub SegSs: u16,
    pub EFlags: u32,
    pub Dr0: u64,
    pub Dr1: u64,
    pub Dr2: u64,
    pub Dr3: u64,
    pub Dr6: u64,
    pub Dr7: u64,
    pub Rax: u64,
    pub Rcx: u64,
    pub Rdx: u64,
    pub Rbx: u64,
    pub Rsp: u64,
    pub Rbp: u64,
    pub Rsi: u64,
    pub Rdi: u64,
    pub R8: u64,
    pub R9: u64,
    pub R10: u64,
    pub R11: u64,
    pub R12: u64,
    pub R13: u64,
    pub R14: u64,
    pub R15: u64,
    pub Rip: u64,
    pub Header: [u128; 2],
    pub Legacy: [u128; 8],
    pub Xmm0: u128,
    pub Xmm1: u128,
    pub Xmm2: u128,
    pub Xmm3: u128,
    pub Xmm4: u128,
    pub Xmm5: u128,
    pub Xmm6: u128,
    pub Xmm7: u128,
    pub Xmm8: u128,
    pub Xmm9: u128,
    pub Xmm10: u128,
    pub Xmm11: u128,
    pub Xmm12: u128,
    pub Xmm13: u128,
    pub Xmm14: u128,
    pub Xmm15: u128,
    pub Padding: [u8; 0x60],
    pub VectorRegister: [u128; 26],
    pub VectorControl: u64,
    pub DebugControl: u64,
    pub LastBranchToRip: u64,
    pub LastBranchFromRip: u64,
    pub LastExceptionToRip: u64,
    pub LastExceptionFromRip: u64,
}

/// CONTEXT structure representing 32 bits.
#[derive(Clone, Debug)]
#[binrw::binrw]
#[brw(little)]
pub struct CONTEXT_X86 {
    pub ContextFlags: u32,
    pub Dr0: u32,
    pub Dr1: u32,
    pub Dr2: u32,
    pub Dr3: u32,
    pub Dr6: u32,
    pub Dr7: u32,
    pub ControlWord: u32,
    pub StatusWord: u32,
    pub TagWord: u32,
    pub ErrorOffset: u32,
    pub ErrorSelector: u32,
    pub DataOffset: u32,
    pub DataSelector: u32,
    pub RegisterArea: [u8; 80],
    pub Spare0: u32,
    pub SegGs: u32,
    pub SegFs: u32,
    pub SegEs: u32,
    pub SegDs: u32,
    pub Edi: u32,
    pub Esi: u32,
    pub Ebx: u32,
    pub Edx: u32,
    pub Ecx: u32,
    pub Eax: u32,
    pub Ebp: u32,
    pub Eip: u32,
    pub SegCs: u32,
    pub EFlags: u32,
    pub Esp: u32,
    pub SegSs: u32,
    pub ExtendedRegisters: [u8; 512],
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::BinRead;
    use std::io::Cursor;

    #[test]
    fn header_splits_version_words() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MINIDUMP_SIGNATURE.to_le_bytes());
        bytes.extend_from_slice(&0xA793u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());

        let header = MINIDUMP_HEADER::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(header.Signature, MINIDUMP_SIGNATURE);
        assert_eq!(header.Version, 0xA793);
        assert_eq!(header.ImplementationVersion, 0);
        assert_eq!(header.TimeDateStamp, 1_700_000_000);
    }

    #[test]
    fn thread_list_count_cap_fails_the_decode() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(MAX_THREAD_COUNT + 1).to_le_bytes());

        assert!(MINIDUMP_THREAD_LIST::read(&mut Cursor::new(&bytes)).is_err());
    }

    #[test]
    fn handle_descriptor_v1_and_v2_sizes() {
        let bytes = [0u8; 40];

        let v1 =
            MINIDUMP_HANDLE_DESCRIPTOR::read_le_args(&mut Cursor::new(&bytes[..32]), (false,))
                .unwrap();
        assert!(v1.ObjectInfoRva.is_none());

        let v2 =
            MINIDUMP_HANDLE_DESCRIPTOR::read_le_args(&mut Cursor::new(&bytes[..]), (true,))
                .unwrap();
        assert_eq!(v2.ObjectInfoRva, Some(0));
    }

    #[test]
    fn stream_type_catch_all() {
        assert_eq!(
            MINIDUMP_STREAM_TYPE::from(24),
            MINIDUMP_STREAM_TYPE::ThreadNamesStream
        );
        assert_eq!(
            MINIDUMP_STREAM_TYPE::from(0x8001),
            MINIDUMP_STREAM_TYPE::Other(0x8001)
        );
    }
}
