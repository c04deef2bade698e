use std::{
    collections::BTreeMap,
    fmt,
    io::{self, Cursor, Seek},
    ops::Range,
    path::Path,
};

use binrw::BinRead;
use log::warn;

use crate::classify::{self, ModuleCategory};
use crate::context::{ThreadContext, decode_context};
use crate::data::{
    MINIDUMP_STREAM_TYPE::{self, *},
    *,
};
use crate::error::CrashDmpError;
use crate::mapper::MappingFile;
use crate::reader::DumpReader;
use crate::status;

/// Represents the modules in a minidump file, mapped by their base address.
pub type Modules = BTreeMap<u64, Module>;

/// Represents the threads in a minidump file, mapped by their thread IDs.
pub type Threads = BTreeMap<u32, Thread>;

/// Represents the handles in a minidump file, mapped by their handle values.
pub type Handles = BTreeMap<u64, Handle>;

/// Represents captured memory regions, mapped by their base addresses.
pub type MemoryRegions<'a> = BTreeMap<u64, MemoryRegion<'a>>;

/// Represents memory metadata entries, mapped by their base addresses.
pub type MemoryInfos = BTreeMap<u64, MemoryInfo>;

/// Represents thread names, mapped by thread ID.
pub type ThreadNameMap = BTreeMap<u32, String>;

// Type of error
pub type Result<T> = std::result::Result<T, CrashDmpError>;

/// Represents the processor architecture of the captured process.
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq)]
pub enum Arch {
    /// 32-bit x86.
    X86,

    /// MIPS.
    Mips,

    /// Alpha.
    Alpha,

    /// PowerPC.
    Ppc,

    /// SuperH.
    Shx,

    /// 32-bit ARM.
    Arm,

    /// Itanium.
    Ia64,

    /// 64-bit Alpha.
    Alpha64,

    /// Microsoft intermediate language.
    Msil,

    /// 64-bit x86.
    Amd64,

    /// 32-bit x86 emulated on 64-bit Windows (WOW64).
    X86OnWin64,

    /// Architecture-neutral.
    Neutral,

    /// 64-bit ARM.
    Arm64,

    /// 32-bit ARM emulated on 64-bit Windows.
    Arm32OnWin64,

    /// 32-bit x86 emulated on ARM64 Windows.
    X86OnArm64,

    /// Any value the format does not define.
    #[default]
    Unknown,
}

impl From<u16> for Arch {
    fn from(value: u16) -> Self {
        match value {
            0 => Arch::X86,
            1 => Arch::Mips,
            2 => Arch::Alpha,
            3 => Arch::Ppc,
            4 => Arch::Shx,
            5 => Arch::Arm,
            6 => Arch::Ia64,
            7 => Arch::Alpha64,
            8 => Arch::Msil,
            9 => Arch::Amd64,
            10 => Arch::X86OnWin64,
            11 => Arch::Neutral,
            12 => Arch::Arm64,
            13 => Arch::Arm32OnWin64,
            14 => Arch::X86OnArm64,
            _ => Arch::Unknown,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::X86 => "x86",
            Arch::Mips => "MIPS",
            Arch::Alpha => "Alpha",
            Arch::Ppc => "PowerPC",
            Arch::Shx => "SHx",
            Arch::Arm => "ARM",
            Arch::Ia64 => "IA-64",
            Arch::Alpha64 => "Alpha64",
            Arch::Msil => "MSIL",
            Arch::Amd64 => "x64",
            Arch::X86OnWin64 => "x86 on x64",
            Arch::Neutral => "Neutral",
            Arch::Arm64 => "ARM64",
            Arch::Arm32OnWin64 => "ARM32 on x64",
            Arch::X86OnArm64 => "x86 on ARM64",
            Arch::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// The Windows product type reported by the SystemInfo stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ProductType {
    Workstation,
    DomainController,
    Server,
    #[default]
    Unknown,
}

impl From<u8> for ProductType {
    fn from(value: u8) -> Self {
        match value {
            1 => ProductType::Workstation,
            2 => ProductType::DomainController,
            3 => ProductType::Server,
            _ => ProductType::Unknown,
        }
    }
}

/// The Windows platform family. Only the three canonical ids decode;
/// anything else is `Unknown` without failing the stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlatformId {
    Win32s,
    Win32Windows,
    Win32Nt,
    #[default]
    Unknown,
}

impl From<u32> for PlatformId {
    fn from(value: u32) -> Self {
        match value {
            0 => PlatformId::Win32s,
            1 => PlatformId::Win32Windows,
            2 => PlatformId::Win32Nt,
            _ => PlatformId::Unknown,
        }
    }
}

/// The architecture-dependent half of the SystemInfo stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CpuInfo {
    /// x86/x64 variant: CPUID vendor string and feature words.
    X86 {
        vendor_id: [u32; 3],
        version_info: u32,
        feature_info: u32,
        extended_features: u32,
    },

    /// Every other architecture: opaque processor feature bits.
    Other { processor_features: [u64; 2] },
}

impl CpuInfo {
    /// Returns the CPUID vendor string ("GenuineIntel", "AuthenticAMD", ...).
    pub fn vendor(&self) -> Option<String> {
        match self {
            CpuInfo::X86 { vendor_id, .. } => {
                let mut bytes = Vec::with_capacity(12);
                for word in vendor_id {
                    bytes.extend_from_slice(&word.to_le_bytes());
                }
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            CpuInfo::Other { .. } => None,
        }
    }

    /// Returns the display family, folding in CPUID's extended family when
    /// the base family is 6 or 15.
    pub fn display_family(&self) -> Option<u32> {
        let version = self.version_info()?;
        let family = (version >> 8) & 0xF;
        if family == 6 || family == 15 {
            Some(family + ((version >> 20) & 0xFF))
        } else {
            Some(family)
        }
    }

    /// Returns the display model, folding in CPUID's extended model when
    /// the base family is 6 or 15.
    pub fn display_model(&self) -> Option<u32> {
        let version = self.version_info()?;
        let family = (version >> 8) & 0xF;
        let model = (version >> 4) & 0xF;
        if family == 6 || family == 15 {
            Some(model + (((version >> 16) & 0xF) << 4))
        } else {
            Some(model)
        }
    }

    /// Returns the CPUID stepping.
    pub fn stepping(&self) -> Option<u32> {
        Some(self.version_info()? & 0xF)
    }

    fn version_info(&self) -> Option<u32> {
        match self {
            CpuInfo::X86 { version_info, .. } => Some(*version_info),
            CpuInfo::Other { .. } => None,
        }
    }
}

/// Represents the system information captured in the minidump.
///
/// The [`System`] struct contains details about the processor architecture,
/// operating system version, and other general system information useful
/// for analyzing the minidump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct System {
    /// The processor architecture captured in the minidump.
    pub processor_architecture: Arch,

    /// The processor level.
    pub processor_level: u16,

    /// The processor revision.
    pub processor_revision: u16,

    /// The number of processors in the captured system.
    pub number_of_processors: u8,

    /// The product type of the operating system.
    pub product_type: ProductType,

    /// The major version of the operating system.
    pub major_version: u32,

    /// The minor version of the operating system.
    pub minor_version: u32,

    /// The build number of the operating system.
    pub build_number: u32,

    /// The platform identifier of the operating system.
    pub platform_id: PlatformId,

    /// The product suite flags.
    pub suite_mask: u16,

    /// The installed service pack, resolved from the CSD version RVA.
    pub csd_version: Option<String>,

    /// The architecture-dependent CPU identification.
    pub cpu: CpuInfo,

    csd_version_rva: u32,
}

impl System {
    /// Returns the marketing name of the operating system version.
    ///
    /// Windows 11 reports itself as 10.0 and is told apart by build number.
    pub fn os_name(&self) -> String {
        match (self.major_version, self.minor_version) {
            (10, 0) if self.build_number >= 22000 => "Windows 11".to_string(),
            (10, 0) => "Windows 10".to_string(),
            (6, 3) => "Windows 8.1".to_string(),
            (6, 2) => "Windows 8".to_string(),
            (6, 1) => "Windows 7".to_string(),
            (6, 0) => "Windows Vista".to_string(),
            (5, 2) => "Windows Server 2003/XP x64".to_string(),
            (5, 1) => "Windows XP".to_string(),
            (5, 0) => "Windows 2000".to_string(),
            (major, minor) => format!("Windows {major}.{minor}"),
        }
    }
}

impl<'a> MinidumpStream<'a> for System {
    type Output = System;

    fn parse(
        cursor: &mut Cursor<&'a [u8]>,
        _location: &MINIDUMP_LOCATION_DESCRIPTOR,
    ) -> Result<Self::Output> {
        let info = MINIDUMP_SYSTEM_INFO::read(cursor)?;
        let arch = Arch::from(info.ProcessorArchitecture);

        // The trailing union is keyed on the architecture: CPUID words for
        // the x86 family, opaque feature bits for everything else.
        let cpu = match arch {
            Arch::X86 | Arch::Amd64 | Arch::X86OnWin64 | Arch::X86OnArm64 => {
                let word = |index: usize| {
                    let mut bytes = [0u8; 4];
                    bytes.copy_from_slice(&info.Cpu[index * 4..index * 4 + 4]);
                    u32::from_le_bytes(bytes)
                };
                CpuInfo::X86 {
                    vendor_id: [word(0), word(1), word(2)],
                    version_info: word(3),
                    feature_info: word(4),
                    extended_features: word(5),
                }
            }
            _ => {
                let word = |index: usize| {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&info.Cpu[index * 8..index * 8 + 8]);
                    u64::from_le_bytes(bytes)
                };
                CpuInfo::Other {
                    processor_features: [word(0), word(1)],
                }
            }
        };

        Ok(System {
            processor_architecture: arch,
            processor_level: info.ProcessorLevel,
            processor_revision: info.ProcessorRevision,
            number_of_processors: info.NumberOfProcessors,
            product_type: ProductType::from(info.ProductType),
            major_version: info.MajorVersion,
            minor_version: info.MinorVersion,
            build_number: info.BuildNumber,
            platform_id: PlatformId::from(info.PlatformId),
            suite_mask: info.SuiteMask,
            csd_version: None,
            cpu,
            csd_version_rva: info.CSDVersionRva,
        })
    }
}

/// Process CPU times from the MiscInfo stream, in seconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProcessTimes {
    pub create_time: u32,
    pub user_time: u32,
    pub kernel_time: u32,
}

/// Processor power information from the MiscInfo stream (version 2).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProcessorPower {
    pub max_mhz: u32,
    pub current_mhz: u32,
    pub mhz_limit: u32,
    pub max_idle_state: u32,
    pub current_idle_state: u32,
}

/// Time-zone information from the MiscInfo stream (version 3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeZoneInfo {
    pub time_zone_id: u32,

    /// Minutes west of UTC.
    pub bias: i32,

    pub standard_name: String,
    pub daylight_name: String,
}

/// OS build strings from the MiscInfo stream (version 4).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildStrings {
    pub build: String,
    pub dbg_build: String,
}

/// Represents the miscellaneous process information captured in the minidump.
///
/// Every field after `flags` is gated by a flag bit; a field whose gate bit
/// is clear (or whose MiscInfo revision is too old to contain it) is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MiscInfo {
    /// The size of the MiscInfo record as written.
    pub size_of_info: u32,

    /// The validity flags gating the remaining fields.
    pub flags: u32,

    /// The process identifier.
    pub process_id: Option<u32>,

    /// Process creation time and CPU usage.
    pub process_times: Option<ProcessTimes>,

    /// Processor speed and idle-state information.
    pub processor_power: Option<ProcessorPower>,

    /// The process integrity level.
    pub integrity_level: Option<u32>,

    /// The process execute flags.
    pub execute_flags: Option<u32>,

    /// Non-zero when the process was a protected process.
    pub protected_process: Option<u32>,

    /// The system time zone at capture time.
    pub time_zone: Option<TimeZoneInfo>,

    /// The OS build strings.
    pub build_strings: Option<BuildStrings>,
}

// Minimum record sizes for each MiscInfo revision.
const MISC_INFO_SIZE_V1: u32 = 24;
const MISC_INFO_SIZE_V2: u32 = 44;
const MISC_INFO_SIZE_V3: u32 = 232;
const MISC_INFO_SIZE_V4: u32 = 1128;

impl<'a> MinidumpStream<'a> for MiscInfo {
    type Output = MiscInfo;

    fn parse(
        cursor: &mut Cursor<&'a [u8]>,
        location: &MINIDUMP_LOCATION_DESCRIPTOR,
    ) -> Result<Self::Output> {
        let reader = DumpReader::new(*cursor.get_ref());
        let rva = location.RVA as u64;

        let size_of_info = reader.u32_at(rva).ok_or(CrashDmpError::OutOfRange {
            rva,
            size: 4,
        })?;
        if size_of_info < MISC_INFO_SIZE_V1 {
            return Err(CrashDmpError::OutOfRange {
                rva,
                size: size_of_info as u64,
            });
        }
        let in_bounds = rva
            .checked_add(size_of_info as u64)
            .is_some_and(|end| end <= reader.len() as u64);
        if !in_bounds {
            return Err(CrashDmpError::OutOfRange {
                rva,
                size: size_of_info as u64,
            });
        }

        let flags = reader.u32_at(rva + 4).unwrap_or(0);
        let has = |bit: u32, min_size: u32| flags & bit != 0 && size_of_info >= min_size;

        let mut info = MiscInfo {
            size_of_info,
            flags,
            ..Default::default()
        };

        if has(MISC1_PROCESS_ID, MISC_INFO_SIZE_V1) {
            info.process_id = reader.u32_at(rva + 8);
        }

        if has(MISC1_PROCESS_TIMES, MISC_INFO_SIZE_V1) {
            info.process_times = (|| {
                Some(ProcessTimes {
                    create_time: reader.u32_at(rva + 12)?,
                    user_time: reader.u32_at(rva + 16)?,
                    kernel_time: reader.u32_at(rva + 20)?,
                })
            })();
        }

        if has(MISC1_PROCESSOR_POWER_INFO, MISC_INFO_SIZE_V2) {
            info.processor_power = (|| {
                Some(ProcessorPower {
                    max_mhz: reader.u32_at(rva + 24)?,
                    current_mhz: reader.u32_at(rva + 28)?,
                    mhz_limit: reader.u32_at(rva + 32)?,
                    max_idle_state: reader.u32_at(rva + 36)?,
                    current_idle_state: reader.u32_at(rva + 40)?,
                })
            })();
        }

        if has(MISC3_PROCESS_INTEGRITY, MISC_INFO_SIZE_V3) {
            info.integrity_level = reader.u32_at(rva + 44);
        }

        if has(MISC3_PROCESS_EXECUTE_FLAGS, MISC_INFO_SIZE_V3) {
            info.execute_flags = reader.u32_at(rva + 48);
        }

        if has(MISC3_PROTECTED_PROCESS, MISC_INFO_SIZE_V3) {
            info.protected_process = reader.u32_at(rva + 52);
        }

        if has(MISC3_TIMEZONE, MISC_INFO_SIZE_V3) {
            info.time_zone = (|| {
                Some(TimeZoneInfo {
                    time_zone_id: reader.u32_at(rva + 56)?,
                    bias: reader.i32_at(rva + 60)?,
                    standard_name: reader.utf16_fixed_at(rva + 64, 64)?,
                    daylight_name: reader.utf16_fixed_at(rva + 196, 64)?,
                })
            })();
        }

        if has(MISC4_BUILDSTRING, MISC_INFO_SIZE_V4) {
            info.build_strings = (|| {
                Some(BuildStrings {
                    build: reader.utf16_fixed_at(rva + 232, 520)?,
                    dbg_build: reader.utf16_fixed_at(rva + 752, 80)?,
                })
            })();
        }

        Ok(info)
    }
}

/// The memory operation an access violation was attempting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessViolationOperation {
    Read,
    Write,
    Execute,
    Access,
}

impl AccessViolationOperation {
    fn from_parameter(value: u64) -> Self {
        match value {
            0 => AccessViolationOperation::Read,
            1 => AccessViolationOperation::Write,
            8 => AccessViolationOperation::Execute,
            _ => AccessViolationOperation::Access,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            AccessViolationOperation::Read => "reading from",
            AccessViolationOperation::Write => "writing to",
            AccessViolationOperation::Execute => "executing",
            AccessViolationOperation::Access => "accessing",
        }
    }
}

/// Represents the exception captured in the minidump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exception {
    /// The identifier of the thread that raised the exception.
    pub thread_id: u32,

    /// The NT status code of the exception.
    pub code: u32,

    /// Zero for a continuable exception, EXCEPTION_NONCONTINUABLE otherwise.
    pub flags: u32,

    /// The address of a nested exception record, if any.
    pub nested_record: u64,

    /// The address where the exception occurred.
    pub address: u64,

    /// The exception parameters, at most [`EXCEPTION_MAXIMUM_PARAMETERS`].
    pub parameters: Vec<u64>,

    /// Location of the thread context saved at exception time.
    pub context_location: MINIDUMP_LOCATION_DESCRIPTOR,
}

impl Exception {
    /// Returns the symbolic NT status name of the exception code.
    pub fn code_name(&self) -> String {
        status::name(self.code)
    }

    /// Returns the NT status description of the exception code.
    pub fn code_description(&self) -> &'static str {
        status::description(self.code)
    }

    /// For an access violation with both parameters captured, renders the
    /// classic "tried reading from address" sentence.
    pub fn access_violation_details(&self) -> Option<String> {
        if self.code != status::EXCEPTION_ACCESS_VIOLATION || self.parameters.len() < 2 {
            return None;
        }
        let operation = AccessViolationOperation::from_parameter(self.parameters[0]);
        Some(format!(
            "The instruction at 0x{:016X} tried {} address 0x{:016X}",
            self.address,
            operation.phrase(),
            self.parameters[1],
        ))
    }
}

impl<'a> MinidumpStream<'a> for Exception {
    type Output = Exception;

    fn parse(
        cursor: &mut Cursor<&'a [u8]>,
        _location: &MINIDUMP_LOCATION_DESCRIPTOR,
    ) -> Result<Self::Output> {
        let stream = MINIDUMP_EXCEPTION_STREAM::read(cursor)?;
        let record = stream.ExceptionRecord;

        let count = record.NumberParameters.min(EXCEPTION_MAXIMUM_PARAMETERS as u32) as usize;
        let parameters = record.ExceptionInformation[..count].to_vec();

        Ok(Exception {
            thread_id: stream.ThreadId,
            code: record.ExceptionCode,
            flags: record.ExceptionFlags,
            nested_record: record.ExceptionRecord,
            address: record.ExceptionAddress,
            parameters,
            context_location: stream.ThreadContext,
        })
    }
}

/// Represents a thread in the process, as captured in the minidump file.
///
/// The `Thread` struct contains metadata about the thread, such as its ID,
/// priority, and execution context.
#[derive(Debug, Clone)]
pub struct Thread {
    /// The unique identifier (ID) of the thread.
    pub thread_id: u32,

    /// The number of times the thread has been suspended.
    pub suspend_count: u32,

    /// The priority class of the thread.
    pub priority_class: u32,

    /// The priority level of the thread within its priority class.
    pub priority: u32,

    /// The address of the Thread Environment Block (TEB), containing per-thread information.
    pub teb: u64,

    /// The lowest virtual address of the captured stack.
    pub stack_base: u64,

    /// The captured stack size in bytes.
    pub stack_size: u32,

    /// The execution context of the thread, when its location decoded.
    context: Option<ThreadContext>,
}

impl Thread {
    /// Returns the execution context of the thread, if one decoded.
    pub fn context(&self) -> Option<&ThreadContext> {
        self.context.as_ref()
    }

    /// Returns one past the highest virtual address of the captured stack.
    pub fn stack_end(&self) -> u64 {
        self.stack_base.saturating_add(self.stack_size as u64)
    }

    /// Parses the list of threads from the `ThreadListStream`.
    ///
    /// A thread whose context location fails to decode keeps its metadata
    /// and simply carries no context.
    fn parse(cursor: &mut Cursor<&[u8]>, arch: Arch) -> Result<Threads> {
        let thread_list = MINIDUMP_THREAD_LIST::read(cursor)?;
        let buffer = *cursor.get_ref();

        let threads = thread_list
            .Threads
            .iter()
            .map(|thread| {
                let context = (thread.ThreadContext.DataSize > 0)
                    .then(|| decode_context(buffer, arch, &thread.ThreadContext))
                    .flatten();

                let thread = Thread {
                    thread_id: thread.ThreadId,
                    suspend_count: thread.SuspendCount,
                    priority_class: thread.PriorityClass,
                    priority: thread.Priority,
                    teb: thread.Teb,
                    stack_base: thread.Stack.StartOfMemoryRange,
                    stack_size: thread.Stack.Memory.DataSize,
                    context,
                };
                (thread.thread_id, thread)
            })
            .collect::<Threads>();

        Ok(threads)
    }
}

/// A GUID as stored in a CodeView PDB 7.0 record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
    }
}

/// The debug-info stub of a module, pointing at its PDB.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodeView {
    /// The RSDS (PDB 7.0) record: GUID, age and PDB path.
    Pdb70 { guid: Guid, age: u32, pdb_name: String },

    /// The NB10 (PDB 2.0) record: offset, timestamp, age and PDB path.
    Pdb20 {
        offset: u32,
        timestamp: u32,
        age: u32,
        pdb_name: String,
    },
}

impl CodeView {
    /// Returns the PDB file name the record points at.
    pub fn pdb_name(&self) -> &str {
        match self {
            CodeView::Pdb70 { pdb_name, .. } | CodeView::Pdb20 { pdb_name, .. } => pdb_name,
        }
    }

    /// Returns the PDB age.
    pub fn age(&self) -> u32 {
        match self {
            CodeView::Pdb70 { age, .. } | CodeView::Pdb20 { age, .. } => *age,
        }
    }
}

/// Decodes a module's CodeView record, if it carries a usable one.
fn decode_codeview(
    reader: &DumpReader<'_>,
    location: &MINIDUMP_LOCATION_DESCRIPTOR,
) -> Option<CodeView> {
    if location.DataSize < 24 {
        return None;
    }
    let rva = location.RVA as u64;
    let record = reader.bytes_at(rva, location.DataSize as usize)?;

    let signature = reader.u32_at(rva)?;
    match signature {
        CV_SIGNATURE_RSDS => {
            let guid = Guid {
                data1: reader.u32_at(rva + 4)?,
                data2: reader.u16_at(rva + 8)?,
                data3: reader.u16_at(rva + 10)?,
                data4: reader.bytes_at(rva + 12, 8)?.try_into().ok()?,
            };
            Some(CodeView::Pdb70 {
                guid,
                age: reader.u32_at(rva + 20)?,
                pdb_name: decode_pdb_name(&record[24..]),
            })
        }
        CV_SIGNATURE_NB10 => Some(CodeView::Pdb20 {
            offset: reader.u32_at(rva + 4)?,
            timestamp: reader.u32_at(rva + 8)?,
            age: reader.u32_at(rva + 12)?,
            pdb_name: decode_pdb_name(&record[16..]),
        }),
        _ => None,
    }
}

// The filename runs to the end of the record, NUL-terminated.
fn decode_pdb_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Represents a module loaded in the captured process, including its memory
/// range, identity fields and debug-info record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// The memory range of the module. The end saturates on overflow.
    pub range: Range<u64>,

    /// The checksum of the module.
    pub checksum: u32,

    /// The timestamp when the module was built, represented as a 32-bit UNIX time value.
    pub time_date_stamp: u32,

    /// The path to the module file, as recorded in the dump.
    pub path: String,

    /// The fixed version record, present when its signature was valid.
    pub version_info: Option<VS_FIXEDFILEINFO>,

    /// The CodeView (PDB) record, when one decoded.
    pub codeview: Option<CodeView>,
}

impl Module {
    /// Returns the file name of the module: the substring after the last
    /// path separator.
    pub fn name(&self) -> &str {
        classify::short_name(&self.path)
    }

    /// Returns the blame category of the module.
    pub fn category(&self) -> ModuleCategory {
        classify::category(&self.path)
    }

    /// Returns the starting memory address of the module.
    pub fn start_addr(&self) -> u64 {
        self.range.start
    }

    /// Returns one past the ending memory address of the module.
    pub fn end_addr(&self) -> u64 {
        self.range.end
    }

    /// Returns the size of the module in bytes.
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    /// Returns true if the module has zero size.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the four-part file version, when version info is present.
    pub fn file_version(&self) -> Option<String> {
        let info = self.version_info.as_ref()?;
        Some(format!(
            "{}.{}.{}.{}",
            info.dwFileVersionMS >> 16,
            info.dwFileVersionMS & 0xFFFF,
            info.dwFileVersionLS >> 16,
            info.dwFileVersionLS & 0xFFFF,
        ))
    }
}

impl<'a> MinidumpStream<'a> for Module {
    type Output = Modules;

    fn parse(
        cursor: &mut Cursor<&'a [u8]>,
        _location: &MINIDUMP_LOCATION_DESCRIPTOR,
    ) -> Result<Self::Output> {
        let module_list = MINIDUMP_MODULE_LIST::read(cursor)?;
        let reader = DumpReader::new(*cursor.get_ref());

        let modules = module_list
            .Modules
            .iter()
            .map(|module| {
                // A name RVA that fails to resolve degrades to "".
                let path = reader
                    .utf16_string_at(module.ModuleNameRva as u64)
                    .unwrap_or_default();

                let version_info =
                    (module.VersionInfo.dwSignature == VS_FFI_SIGNATURE).then_some(module.VersionInfo);

                let module = Module {
                    range: module.BaseOfImage
                        ..module.BaseOfImage.saturating_add(module.SizeOfImage as u64),
                    checksum: module.CheckSum,
                    time_date_stamp: module.TimeDateStamp,
                    path,
                    version_info,
                    codeview: decode_codeview(&reader, &module.CvRecord),
                };
                (module.range.start, module)
            })
            .collect::<Modules>();

        Ok(modules)
    }
}

/// Represents a module that was unloaded before the dump was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnloadedModule {
    /// The memory range the module occupied. The end saturates on overflow.
    pub range: Range<u64>,

    /// The checksum of the module.
    pub checksum: u32,

    /// The timestamp of the module image.
    pub time_date_stamp: u32,

    /// The path to the module file, as recorded in the dump.
    pub path: String,
}

impl UnloadedModule {
    /// Returns the file name of the module.
    pub fn name(&self) -> &str {
        classify::short_name(&self.path)
    }
}

impl<'a> MinidumpStream<'a> for UnloadedModule {
    type Output = Vec<UnloadedModule>;

    fn parse(
        cursor: &mut Cursor<&'a [u8]>,
        location: &MINIDUMP_LOCATION_DESCRIPTOR,
    ) -> Result<Self::Output> {
        let header = MINIDUMP_UNLOADED_MODULE_LIST::read(cursor)?;
        let reader = DumpReader::new(*cursor.get_ref());

        if header.SizeOfEntry < 24 {
            return Err(CrashDmpError::OutOfRange {
                rva: location.RVA as u64,
                size: header.SizeOfEntry as u64,
            });
        }
        validate_entry_table(
            location,
            header.SizeOfHeader,
            header.SizeOfEntry,
            header.NumberOfEntries as u64,
        )?;

        let mut modules = Vec::with_capacity(header.NumberOfEntries as usize);
        for index in 0..header.NumberOfEntries as u64 {
            let entry_rva =
                location.RVA as u64 + header.SizeOfHeader as u64 + index * header.SizeOfEntry as u64;
            cursor.seek(io::SeekFrom::Start(entry_rva))?;
            let entry = MINIDUMP_UNLOADED_MODULE::read(cursor)?;

            modules.push(UnloadedModule {
                range: entry.BaseOfImage
                    ..entry.BaseOfImage.saturating_add(entry.SizeOfImage as u64),
                checksum: entry.CheckSum,
                time_date_stamp: entry.TimeDateStamp,
                path: reader
                    .utf16_string_at(entry.ModuleNameRva as u64)
                    .unwrap_or_default(),
            });
        }

        Ok(modules)
    }
}

/// A captured region of the process's memory, backed by bytes of the dump
/// file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion<'a> {
    /// The virtual address range of the region. The end saturates on overflow.
    pub range: Range<u64>,

    /// Where in the dump file the region's bytes begin.
    pub file_offset: u64,

    /// The raw bytes of the region, clamped to the end of the dump file.
    pub data: &'a [u8],
}

impl<'a> MemoryRegion<'a> {
    /// Returns the starting address of the memory region.
    pub fn start_addr(&self) -> u64 {
        self.range.start
    }

    /// Returns one past the ending address of the memory region.
    pub fn end_addr(&self) -> u64 {
        self.range.end
    }

    /// Returns the size of the memory region in bytes.
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    /// Returns true if the memory region has zero size.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses memory regions from the `Memory64ListStream`.
    ///
    /// The file offset of each region is accumulated from `BaseRva`; an
    /// overflow during accumulation ends the iteration, keeping the regions
    /// parsed so far.
    fn parse_memory64_list(cursor: &mut Cursor<&'a [u8]>) -> Result<MemoryRegions<'a>> {
        let memory64_list = MINIDUMP_MEMORY64_LIST::read(cursor)?;
        let buffer = *cursor.get_ref();

        let mut regions = MemoryRegions::new();
        let mut file_offset = memory64_list.BaseRva;

        for descriptor in &memory64_list.Ranges {
            let region = MemoryRegion {
                range: descriptor.StartOfMemoryRange
                    ..descriptor
                        .StartOfMemoryRange
                        .saturating_add(descriptor.DataSize),
                file_offset,
                data: clamp_file_slice(buffer, file_offset, descriptor.DataSize),
            };
            regions.insert(region.range.start, region);

            file_offset = match file_offset.checked_add(descriptor.DataSize) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(regions)
    }

    /// Parses memory regions from the `MemoryListStream`, where each range
    /// carries its own location descriptor.
    fn parse_memory_list(cursor: &mut Cursor<&'a [u8]>) -> Result<MemoryRegions<'a>> {
        let memory_list = MINIDUMP_MEMORY_LIST::read(cursor)?;
        let buffer = *cursor.get_ref();

        let regions = memory_list
            .MemoryRanges
            .iter()
            .map(|descriptor| {
                let region = MemoryRegion {
                    range: descriptor.StartOfMemoryRange
                        ..descriptor
                            .StartOfMemoryRange
                            .saturating_add(descriptor.Memory.DataSize as u64),
                    file_offset: descriptor.Memory.RVA as u64,
                    data: clamp_file_slice(
                        buffer,
                        descriptor.Memory.RVA as u64,
                        descriptor.Memory.DataSize as u64,
                    ),
                };
                (region.range.start, region)
            })
            .collect::<MemoryRegions<'a>>();

        Ok(regions)
    }
}

// Returns the largest slice of `buffer` available for a region whose bytes
// claim to start at `offset` and run for `size` bytes.
fn clamp_file_slice(buffer: &[u8], offset: u64, size: u64) -> &[u8] {
    let len = buffer.len() as u64;
    let start = offset.min(len);
    let end = offset.saturating_add(size).min(len);
    &buffer[start as usize..end as usize]
}

/// The commit state of a memory region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryState {
    Commit,
    Reserve,
    Free,
    Unknown(u32),
}

impl From<u32> for MemoryState {
    fn from(value: u32) -> Self {
        match value {
            0x1000 => MemoryState::Commit,
            0x2000 => MemoryState::Reserve,
            0x10000 => MemoryState::Free,
            other => MemoryState::Unknown(other),
        }
    }
}

impl fmt::Display for MemoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryState::Commit => f.write_str("MEM_COMMIT"),
            MemoryState::Reserve => f.write_str("MEM_RESERVE"),
            MemoryState::Free => f.write_str("MEM_FREE"),
            MemoryState::Unknown(value) => write!(f, "0x{value:x}"),
        }
    }
}

/// The backing kind of a memory region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    Image,
    Mapped,
    Private,
    Unknown(u32),
}

impl From<u32> for MemoryKind {
    fn from(value: u32) -> Self {
        match value {
            0x1_000_000 => MemoryKind::Image,
            0x40000 => MemoryKind::Mapped,
            0x20000 => MemoryKind::Private,
            other => MemoryKind::Unknown(other),
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Image => f.write_str("MEM_IMAGE"),
            MemoryKind::Mapped => f.write_str("MEM_MAPPED"),
            MemoryKind::Private => f.write_str("MEM_PRIVATE"),
            MemoryKind::Unknown(value) => write!(f, "0x{value:x}"),
        }
    }
}

bitflags::bitflags! {
    /// Windows page-protection bits.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct PageProtection: u32 {
        const NOACCESS = 0x01;
        const READONLY = 0x02;
        const READWRITE = 0x04;
        const WRITECOPY = 0x08;
        const EXECUTE = 0x10;
        const EXECUTE_READ = 0x20;
        const EXECUTE_READWRITE = 0x40;
        const EXECUTE_WRITECOPY = 0x80;
        const GUARD = 0x100;
        const NOCACHE = 0x200;
        const WRITECOMBINE = 0x400;
    }
}

impl PageProtection {
    /// Renders the protection in debugger shortform ("RWX+G+NC", ...).
    pub fn shortform(&self) -> String {
        let base = if self.contains(PageProtection::EXECUTE_READWRITE) {
            "RWX"
        } else if self.contains(PageProtection::EXECUTE_WRITECOPY) {
            "RWXC"
        } else if self.contains(PageProtection::EXECUTE_READ) {
            "RX"
        } else if self.contains(PageProtection::EXECUTE) {
            "X"
        } else if self.contains(PageProtection::READWRITE) {
            "RW"
        } else if self.contains(PageProtection::WRITECOPY) {
            "WC"
        } else if self.contains(PageProtection::READONLY) {
            "R"
        } else if self.contains(PageProtection::NOACCESS) {
            "NA"
        } else {
            "-"
        };

        let mut text = base.to_string();
        if self.contains(PageProtection::GUARD) {
            text.push_str("+G");
        }
        if self.contains(PageProtection::NOCACHE) {
            text.push_str("+NC");
        }
        if self.contains(PageProtection::WRITECOMBINE) {
            text.push_str("+WC");
        }
        text
    }
}

/// Metadata about one region of the process's address space, from the
/// `MemoryInfoListStream`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryInfo {
    /// The address range of the region. The end saturates on overflow.
    pub base: u64,

    /// The size of the region in bytes.
    pub size: u64,

    /// The base address of the enclosing allocation.
    pub allocation_base: u64,

    /// The protection applied when the allocation was created.
    pub allocation_protect: PageProtection,

    /// The commit state of the region.
    pub state: MemoryState,

    /// The current protection of the region.
    pub protect: PageProtection,

    /// The backing kind of the region.
    pub kind: MemoryKind,
}

impl MemoryInfo {
    /// Returns one past the highest address of the region.
    pub fn end_addr(&self) -> u64 {
        self.base.saturating_add(self.size)
    }
}

impl<'a> MinidumpStream<'a> for MemoryInfo {
    type Output = MemoryInfos;

    fn parse(
        cursor: &mut Cursor<&'a [u8]>,
        location: &MINIDUMP_LOCATION_DESCRIPTOR,
    ) -> Result<Self::Output> {
        let header = MINIDUMP_MEMORY_INFO_LIST::read(cursor)?;

        // 48 bytes is the defined entry size; a stream claiming less is lying.
        if header.SizeOfEntry < 48 {
            return Err(CrashDmpError::OutOfRange {
                rva: location.RVA as u64,
                size: header.SizeOfEntry as u64,
            });
        }
        validate_entry_table(
            location,
            header.SizeOfHeader,
            header.SizeOfEntry,
            header.NumberOfEntries,
        )?;

        let mut infos = MemoryInfos::new();
        for index in 0..header.NumberOfEntries {
            let entry_rva =
                location.RVA as u64 + header.SizeOfHeader as u64 + index * header.SizeOfEntry as u64;
            cursor.seek(io::SeekFrom::Start(entry_rva))?;
            let entry = MINIDUMP_MEMORY_INFO::read(cursor)?;

            let info = MemoryInfo {
                base: entry.BaseAddress,
                size: entry.RegionSize,
                allocation_base: entry.AllocationBase,
                allocation_protect: PageProtection::from_bits_retain(entry.AllocationProtect),
                state: MemoryState::from(entry.State),
                protect: PageProtection::from_bits_retain(entry.Protect),
                kind: MemoryKind::from(entry.Type),
            };
            infos.insert(info.base, info);
        }

        Ok(infos)
    }
}

/// Represents a handle in a minidump file, providing metadata about its type,
/// object name, attributes, and granted access rights.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    /// The unique identifier (handle value) for this object.
    pub handle: u64,

    /// The type name of the object associated with the handle (e.g., `File`, `Event`).
    type_name: Option<String>,

    /// The object name associated with the handle, if available (e.g., file path).
    object_name: Option<String>,

    /// The attributes of the handle (e.g., inheritance flags).
    pub attributes: u32,

    /// The access rights granted to this handle.
    pub granted_access: u32,

    /// The number of open handles to the object.
    pub handle_count: u32,

    /// The number of kernel references to the object.
    pub pointer_count: u32,

    /// The RVA of extended object information (V2 descriptors only).
    pub object_info_rva: Option<u32>,
}

impl Handle {
    /// Returns the handle value as a hexadecimal string.
    pub fn handle(&self) -> String {
        format!("0x{:x}", self.handle)
    }

    /// Returns the type name of the object associated with the handle.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Returns the object name associated with the handle.
    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }
}

impl<'a> MinidumpStream<'a> for Handle {
    type Output = Handles;

    fn parse(
        cursor: &mut Cursor<&'a [u8]>,
        location: &MINIDUMP_LOCATION_DESCRIPTOR,
    ) -> Result<Self::Output> {
        let header = MINIDUMP_HANDLE_DATA_STREAM::read(cursor)?;
        let reader = DumpReader::new(*cursor.get_ref());

        if header.SizeOfDescriptor < 32 {
            return Err(CrashDmpError::OutOfRange {
                rva: location.RVA as u64,
                size: header.SizeOfDescriptor as u64,
            });
        }
        let is_v2 = header.SizeOfDescriptor >= 40;
        validate_entry_table(
            location,
            header.SizeOfHeader,
            header.SizeOfDescriptor,
            header.NumberOfDescriptors as u64,
        )?;

        // An RVA of zero means "no name"; a non-zero RVA that fails to
        // resolve degrades to "".
        let resolve = |rva: u32| -> Option<String> {
            (rva != 0).then(|| reader.utf16_string_at(rva as u64).unwrap_or_default())
        };

        let mut handles = Handles::new();
        for index in 0..header.NumberOfDescriptors as u64 {
            let entry_rva = location.RVA as u64
                + header.SizeOfHeader as u64
                + index * header.SizeOfDescriptor as u64;
            cursor.seek(io::SeekFrom::Start(entry_rva))?;
            let descriptor = MINIDUMP_HANDLE_DESCRIPTOR::read_le_args(cursor, (is_v2,))?;

            let handle = Handle {
                handle: descriptor.Handle,
                type_name: resolve(descriptor.TypeNameRva),
                object_name: resolve(descriptor.ObjectNameRva),
                attributes: descriptor.Attributes,
                granted_access: descriptor.GrantedAccess,
                handle_count: descriptor.HandleCount,
                pointer_count: descriptor.PointerCount,
                object_info_rva: descriptor.ObjectInfoRva.filter(|&rva| rva != 0),
            };
            handles.insert(handle.handle, handle);
        }

        Ok(handles)
    }
}

/// Parses the `ThreadNamesStream`.
///
/// Entries are probed at the 12-byte stride of the Microsoft definition;
/// an over-read past the end of the dump ends the walk softly, keeping the
/// names decoded so far.
fn parse_thread_names(reader: &DumpReader<'_>, location: &MINIDUMP_LOCATION_DESCRIPTOR) -> Result<ThreadNameMap> {
    let rva = location.RVA as u64;
    let count = reader.u32_at(rva).ok_or(CrashDmpError::OutOfRange { rva, size: 4 })?;
    if count > MAX_THREAD_NAME_COUNT {
        return Err(CrashDmpError::CountExceedsCap("thread name", count as u64));
    }

    let mut names = ThreadNameMap::new();
    for index in 0..count as u64 {
        let entry_rva = rva + 4 + index * 12;
        let (Some(thread_id), Some(name_rva)) =
            (reader.u32_at(entry_rva), reader.u64_at(entry_rva + 4))
        else {
            break;
        };

        if name_rva != 0 && name_rva <= u32::MAX as u64 {
            let name = reader.utf16_string_at(name_rva).unwrap_or_default();
            names.insert(thread_id, name);
        }
    }

    Ok(names)
}

// Rejects an entry table whose header plus count * stride does not fit in
// its stream location.
fn validate_entry_table(
    location: &MINIDUMP_LOCATION_DESCRIPTOR,
    size_of_header: u32,
    size_of_entry: u32,
    count: u64,
) -> Result<()> {
    let needed = count
        .checked_mul(size_of_entry as u64)
        .and_then(|bytes| bytes.checked_add(size_of_header as u64));
    match needed {
        Some(needed) if needed <= location.DataSize as u64 => Ok(()),
        _ => Err(CrashDmpError::OutOfRange {
            rva: location.RVA as u64,
            size: location.DataSize as u64,
        }),
    }
}

/// Trait to represent the parsing of generic streams in a minidump file.
pub(crate) trait MinidumpStream<'a> {
    /// Defines the type of output expected from the parser.
    type Output;

    /// Processes the stream and returns the corresponding output type.
    ///
    /// The cursor is positioned at the stream's RVA; `location` carries the
    /// stream's extent for decoders that validate entry tables against it.
    fn parse(
        cursor: &mut Cursor<&'a [u8]>,
        location: &MINIDUMP_LOCATION_DESCRIPTOR,
    ) -> Result<Self::Output>;
}

/// Represents a parsed minidump file: the header, the stream directory, and
/// every decoded stream.
///
/// A `CrashDump` is immutable after construction. Streams that failed to
/// decode are absent; only the header and the stream directory can fail the
/// whole parse.
#[derive(Debug)]
pub struct CrashDump<'a> {
    /// The fixed 32-byte header.
    header: MINIDUMP_HEADER,

    /// The raw stream directory, including entries the parser does not decode.
    directory: Vec<MINIDUMP_DIRECTORY>,

    /// System information on the dump.
    system: Option<System>,

    /// Miscellaneous process information.
    misc_info: Option<MiscInfo>,

    /// The exception that produced the dump, if one was captured.
    exception: Option<Exception>,

    /// The list of threads in the captured process.
    threads: Option<Threads>,

    /// The list of modules in the captured process.
    modules: Option<Modules>,

    /// Full-range memory captured by the Memory64List stream.
    memory64: Option<MemoryRegions<'a>>,

    /// Memory captured by the legacy MemoryList stream.
    memory_list: Option<MemoryRegions<'a>>,

    /// Address-space metadata from the MemoryInfoList stream.
    memory_info: Option<MemoryInfos>,

    /// The list of handles in the captured process.
    handles: Option<Handles>,

    /// Modules unloaded before the dump was written.
    unloaded_modules: Option<Vec<UnloadedModule>>,

    /// Names assigned to threads, by thread id.
    thread_names: Option<ThreadNameMap>,

    /// The raw dump bytes every decoded value borrows from.
    buffer: &'a [u8],

    /// Keeps the mapping alive when the dump was opened from a path.
    mapped_file: Option<MappingFile<'a>>,
}

impl<'a> CrashDump<'a> {
    /// Creates a new [`CrashDump`] by mapping and parsing a minidump file
    /// from the given path.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use crashdmp::CrashDump;
    ///
    /// match CrashDump::new("example.dmp") {
    ///     Ok(dump) => println!("Successfully parsed minidump."),
    ///     Err(e) => eprintln!("Failed to parse minidump: {:?}", e),
    /// }
    /// ```
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        // Mapping the file in memory to the target environment (Windows or Linux).
        let mapped_file = MappingFile::new(path.as_ref())?;
        let mut dump = Self::parse(mapped_file.buffer)?;
        dump.mapped_file = Some(mapped_file);
        Ok(dump)
    }

    /// Parses a minidump from a byte blob.
    ///
    /// # Errors
    ///
    /// Exactly three outcomes are fatal: [`CrashDmpError::InvalidSignature`]
    /// (blob too short or wrong magic), [`CrashDmpError::InvalidHeader`] and
    /// [`CrashDmpError::InvalidStreamDirectory`]. Any other problem leaves
    /// the affected stream absent.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let reader = DumpReader::new(buffer);

        // Does the file provided have a minidump signature?
        if buffer.len() < 32 || reader.u32_at(0) != Some(MINIDUMP_SIGNATURE) {
            return Err(CrashDmpError::InvalidSignature);
        }

        let mut cursor = Cursor::new(buffer);
        let header =
            MINIDUMP_HEADER::read(&mut cursor).map_err(|_| CrashDmpError::InvalidHeader)?;

        let directory = Self::parse_directory(&mut cursor, &header)?;

        // Sort streams by their StreamType in descending order to ensure
        // that higher priority or dependent streams are processed first;
        // thread contexts need the architecture from SystemInfo.
        let mut ordered = directory.clone();
        ordered.sort_by_key(|stream| std::cmp::Reverse(stream.StreamType));

        let mut system: Option<System> = None;
        let mut misc_info = None;
        let mut exception = None;
        let mut threads = None;
        let mut modules = None;
        let mut memory64 = None;
        let mut memory_list = None;
        let mut memory_info = None;
        let mut handles = None;
        let mut unloaded_modules = None;
        let mut thread_names = None;

        // Processes each stream based on its type.
        for stream in &ordered {
            let location = stream.Location;
            if !Self::location_in_bounds(&location, buffer.len()) {
                if MINIDUMP_STREAM_TYPE::from(stream.StreamType) != UnusedStream {
                    warn!(
                        "stream {} at rva {:#x} (+{:#x}) leaves the dump; ignored",
                        stream.StreamType, location.RVA, location.DataSize
                    );
                }
                continue;
            }

            // Seeks to the stream data.
            cursor.seek(io::SeekFrom::Start(location.RVA.into()))?;

            match MINIDUMP_STREAM_TYPE::from(stream.StreamType) {
                SystemInfoStream => {
                    system = Self::parse_stream::<System>(&mut cursor, &location, "SystemInfo")
                }
                MiscInfoStream => {
                    misc_info = Self::parse_stream::<MiscInfo>(&mut cursor, &location, "MiscInfo")
                }
                ExceptionStream => {
                    exception = Self::parse_stream::<Exception>(&mut cursor, &location, "Exception")
                }
                ThreadListStream => {
                    let arch = system
                        .as_ref()
                        .map(|system| system.processor_architecture)
                        .unwrap_or_default();
                    threads = Thread::parse(&mut cursor, arch)
                        .map_err(|err| warn!("ThreadList stream ignored: {err}"))
                        .ok();
                }
                ModuleListStream => {
                    modules = Self::parse_stream::<Module>(&mut cursor, &location, "ModuleList")
                }
                Memory64ListStream => {
                    memory64 = MemoryRegion::parse_memory64_list(&mut cursor)
                        .map_err(|err| warn!("Memory64List stream ignored: {err}"))
                        .ok();
                }
                MemoryListStream => {
                    memory_list = MemoryRegion::parse_memory_list(&mut cursor)
                        .map_err(|err| warn!("MemoryList stream ignored: {err}"))
                        .ok();
                }
                MemoryInfoListStream => {
                    memory_info =
                        Self::parse_stream::<MemoryInfo>(&mut cursor, &location, "MemoryInfoList")
                }
                HandleDataStream => {
                    handles = Self::parse_stream::<Handle>(&mut cursor, &location, "HandleData")
                }
                UnloadedModuleListStream => {
                    unloaded_modules = Self::parse_stream::<UnloadedModule>(
                        &mut cursor,
                        &location,
                        "UnloadedModuleList",
                    )
                }
                ThreadNamesStream => {
                    thread_names = parse_thread_names(&reader, &location)
                        .map_err(|err| warn!("ThreadNames stream ignored: {err}"))
                        .ok();
                }
                _ => {}
            }
        }

        // Attach the service-pack string now that every stream is parsed.
        if let Some(system) = system.as_mut() {
            if system.csd_version_rva != 0 {
                system.csd_version = reader.utf16_string_at(system.csd_version_rva as u64);
            }
        }

        Ok(Self {
            header,
            directory,
            system,
            misc_info,
            exception,
            threads,
            modules,
            memory64,
            memory_list,
            memory_info,
            handles,
            unloaded_modules,
            thread_names,
            buffer,
            mapped_file: None,
        })
    }

    /// Reads the stream directory, the only stage after the header that can
    /// fail the whole dump.
    fn parse_directory(
        cursor: &mut Cursor<&'a [u8]>,
        header: &MINIDUMP_HEADER,
    ) -> Result<Vec<MINIDUMP_DIRECTORY>> {
        if header.NumberOfStreams > MAX_STREAM_COUNT {
            return Err(CrashDmpError::InvalidStreamDirectory);
        }

        let len = cursor.get_ref().len() as u64;
        let directory_bytes = (header.NumberOfStreams as u64)
            .checked_mul(12)
            .ok_or(CrashDmpError::InvalidStreamDirectory)?;
        let end = (header.StreamDirectoryRva as u64)
            .checked_add(directory_bytes)
            .ok_or(CrashDmpError::InvalidStreamDirectory)?;
        if end > len {
            return Err(CrashDmpError::InvalidStreamDirectory);
        }

        cursor
            .seek(io::SeekFrom::Start(header.StreamDirectoryRva.into()))
            .map_err(|_| CrashDmpError::InvalidStreamDirectory)?;

        (0..header.NumberOfStreams)
            .map(|_| {
                MINIDUMP_DIRECTORY::read(cursor).map_err(|_| CrashDmpError::InvalidStreamDirectory)
            })
            .collect()
    }

    /// Parses a specific stream type, demoting any failure to absence.
    fn parse_stream<S>(
        cursor: &mut Cursor<&'a [u8]>,
        location: &MINIDUMP_LOCATION_DESCRIPTOR,
        what: &'static str,
    ) -> Option<S::Output>
    where
        S: MinidumpStream<'a>,
    {
        match S::parse(cursor, location) {
            Ok(output) => Some(output),
            Err(err) => {
                warn!("{what} stream ignored: {err}");
                None
            }
        }
    }

    fn location_in_bounds(location: &MINIDUMP_LOCATION_DESCRIPTOR, len: usize) -> bool {
        (location.RVA as u64)
            .checked_add(location.DataSize as u64)
            .is_some_and(|end| end <= len as u64)
    }

    /// Returns the fixed dump header.
    pub fn header(&self) -> &MINIDUMP_HEADER {
        &self.header
    }

    /// Returns the raw stream directory, including streams the parser does
    /// not decode.
    pub fn stream_directory(&self) -> &[MINIDUMP_DIRECTORY] {
        &self.directory
    }

    /// Returns the raw dump bytes.
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Returns the system information, when the stream decoded.
    pub fn system(&self) -> Option<&System> {
        self.system.as_ref()
    }

    /// Returns the miscellaneous process information, when the stream decoded.
    pub fn misc_info(&self) -> Option<&MiscInfo> {
        self.misc_info.as_ref()
    }

    /// Returns the captured exception, when one is present.
    pub fn exception(&self) -> Option<&Exception> {
        self.exception.as_ref()
    }

    /// Returns the threads of the captured process, when the stream decoded.
    pub fn threads(&self) -> Option<&Threads> {
        self.threads.as_ref()
    }

    /// Returns the modules of the captured process, when the stream decoded.
    pub fn modules(&self) -> Option<&Modules> {
        self.modules.as_ref()
    }

    /// Returns the Memory64List regions, when the stream decoded.
    pub fn memory64(&self) -> Option<&MemoryRegions<'a>> {
        self.memory64.as_ref()
    }

    /// Returns the legacy MemoryList regions, when the stream decoded.
    pub fn memory_list(&self) -> Option<&MemoryRegions<'a>> {
        self.memory_list.as_ref()
    }

    /// Returns the address-space metadata, when the stream decoded.
    pub fn memory_info(&self) -> Option<&MemoryInfos> {
        self.memory_info.as_ref()
    }

    /// Returns the handles of the captured process, when the stream decoded.
    pub fn handles(&self) -> Option<&Handles> {
        self.handles.as_ref()
    }

    /// Returns the unloaded modules, when the stream decoded.
    pub fn unloaded_modules(&self) -> Option<&[UnloadedModule]> {
        self.unloaded_modules.as_deref()
    }

    /// Returns the thread-name table, when the stream decoded.
    pub fn thread_names(&self) -> Option<&ThreadNameMap> {
        self.thread_names.as_ref()
    }

    /// Returns the name recorded for a thread, if any.
    pub fn thread_name(&self, thread_id: u32) -> Option<&str> {
        self.thread_names
            .as_ref()?
            .get(&thread_id)
            .map(String::as_str)
    }

    /// Returns the thread the captured exception occurred on.
    pub fn faulting_thread(&self) -> Option<&Thread> {
        let exception = self.exception.as_ref()?;
        self.threads.as_ref()?.get(&exception.thread_id)
    }

    /// Returns the module whose range contains `addr`.
    pub fn module_containing(&self, addr: u64) -> Option<&Module> {
        let (_, module) = self.modules.as_ref()?.range(..=addr).next_back()?;
        (addr < module.range.end).then_some(module)
    }

    /// Renders `addr` as `module+0xoffset` when a containing module exists,
    /// or as a zero-padded hex literal otherwise.
    pub fn resolve(&self, addr: u64) -> String {
        match self.module_containing(addr) {
            Some(module) => format!("{}+0x{:x}", module.name(), addr - module.range.start),
            None => format!("0x{addr:016x}"),
        }
    }

    /// Reads up to `n` bytes of captured memory at virtual address `addr`.
    ///
    /// Memory64 regions are tried first, then the legacy memory list. The
    /// returned slice is the largest available run, at most `n` bytes.
    pub fn read_at(&self, addr: u64, n: usize) -> Option<&'a [u8]> {
        Self::read_regions(self.memory64.as_ref(), addr, n)
            .or_else(|| Self::read_regions(self.memory_list.as_ref(), addr, n))
    }

    fn read_regions(
        regions: Option<&MemoryRegions<'a>>,
        addr: u64,
        n: usize,
    ) -> Option<&'a [u8]> {
        let (base, region) = regions?.range(..=addr).next_back()?;
        if addr >= region.range.end {
            return None;
        }
        let offset = usize::try_from(addr - base).ok()?;
        if offset >= region.data.len() {
            return None;
        }
        let available = region.data.len() - offset;
        Some(&region.data[offset..offset + n.min(available)])
    }

    /// Returns handle type names with their open counts, sorted by
    /// descending count (ties broken alphabetically).
    pub fn handle_type_histogram(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        if let Some(handles) = self.handles.as_ref() {
            for handle in handles.values() {
                if let Some(type_name) = handle.type_name() {
                    *counts.entry(type_name).or_default() += 1;
                }
            }
        }

        let mut histogram: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        histogram.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(major: u32, minor: u32, build: u32) -> System {
        System {
            processor_architecture: Arch::Amd64,
            processor_level: 6,
            processor_revision: 0,
            number_of_processors: 8,
            product_type: ProductType::Workstation,
            major_version: major,
            minor_version: minor,
            build_number: build,
            platform_id: PlatformId::Win32Nt,
            suite_mask: 0,
            csd_version: None,
            cpu: CpuInfo::Other {
                processor_features: [0, 0],
            },
            csd_version_rva: 0,
        }
    }

    #[test]
    fn os_name_table() {
        assert_eq!(system(10, 0, 22631).os_name(), "Windows 11");
        assert_eq!(system(10, 0, 19045).os_name(), "Windows 10");
        assert_eq!(system(6, 3, 9600).os_name(), "Windows 8.1");
        assert_eq!(system(6, 1, 7601).os_name(), "Windows 7");
        assert_eq!(system(5, 1, 2600).os_name(), "Windows XP");
        assert_eq!(system(4, 9, 0).os_name(), "Windows 4.9");
    }

    #[test]
    fn cpu_display_family_folds_extended_fields() {
        // Family 6, model 0xA, ext model 0x9 -> display model 0x9A.
        let cpu = CpuInfo::X86 {
            vendor_id: [0x756E_6547, 0x4965_6E69, 0x6C65_746E],
            version_info: 0x0009_06A4,
            feature_info: 0,
            extended_features: 0,
        };
        assert_eq!(cpu.vendor().as_deref(), Some("GenuineIntel"));
        assert_eq!(cpu.display_family(), Some(6));
        assert_eq!(cpu.display_model(), Some(0x9A));
        assert_eq!(cpu.stepping(), Some(4));

        // Family 0xF folds the extended family in.
        let cpu = CpuInfo::X86 {
            vendor_id: [0; 3],
            version_info: 0x0030_0F10,
            feature_info: 0,
            extended_features: 0,
        };
        assert_eq!(cpu.display_family(), Some(15 + 3));
    }

    #[test]
    fn access_violation_sentence() {
        let exception = Exception {
            thread_id: 1,
            code: 0xC000_0005,
            flags: 0,
            nested_record: 0,
            address: 0x1_4000_1234,
            parameters: vec![0, 0xDEAD_BEEF],
            context_location: MINIDUMP_LOCATION_DESCRIPTOR { DataSize: 0, RVA: 0 },
        };
        assert_eq!(
            exception.access_violation_details().as_deref(),
            Some("The instruction at 0x0000000140001234 tried reading from address 0x00000000DEADBEEF"),
        );

        let write = Exception {
            parameters: vec![1, 0x10],
            ..exception.clone()
        };
        assert_eq!(
            write.access_violation_details().as_deref(),
            Some("The instruction at 0x0000000140001234 tried writing to address 0x0000000000000010"),
        );

        let too_few = Exception {
            parameters: vec![0],
            ..exception.clone()
        };
        assert_eq!(too_few.access_violation_details(), None);

        let other_code = Exception {
            code: 0xC000_00FD,
            ..exception
        };
        assert_eq!(other_code.access_violation_details(), None);
    }

    #[test]
    fn guid_display_is_canonical() {
        let guid = Guid {
            data1: 0x0102_0304,
            data2: 0x0506,
            data3: 0x0708,
            data4: [0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10],
        };
        assert_eq!(guid.to_string(), "01020304-0506-0708-090A-0B0C0D0E0F10");
    }

    #[test]
    fn protection_shortform() {
        assert_eq!(
            PageProtection::from_bits_retain(0x40).shortform(),
            "RWX"
        );
        assert_eq!(
            PageProtection::from_bits_retain(0x40 | 0x100 | 0x200).shortform(),
            "RWX+G+NC"
        );
        assert_eq!(PageProtection::from_bits_retain(0x02).shortform(), "R");
        assert_eq!(PageProtection::from_bits_retain(0).shortform(), "-");
    }

    #[test]
    fn memory_state_and_kind_decode() {
        assert_eq!(MemoryState::from(0x1000), MemoryState::Commit);
        assert_eq!(MemoryState::from(0x9999), MemoryState::Unknown(0x9999));
        assert_eq!(MemoryKind::from(0x1_000_000), MemoryKind::Image);
        assert_eq!(MemoryKind::from(0x20000), MemoryKind::Private);
        assert_eq!(MemoryState::Commit.to_string(), "MEM_COMMIT");
    }

    #[test]
    fn arch_decodes_the_closed_set() {
        assert_eq!(Arch::from(9), Arch::Amd64);
        assert_eq!(Arch::from(12), Arch::Arm64);
        assert_eq!(Arch::from(0), Arch::X86);
        assert_eq!(Arch::from(0xFFFF), Arch::Unknown);
        assert_eq!(Arch::Amd64.to_string(), "x64");
    }

    #[test]
    fn platform_and_product_decode_gracefully() {
        assert_eq!(PlatformId::from(2), PlatformId::Win32Nt);
        assert_eq!(PlatformId::from(300), PlatformId::Unknown);
        assert_eq!(ProductType::from(1), ProductType::Workstation);
        assert_eq!(ProductType::from(9), ProductType::Unknown);
    }
}
