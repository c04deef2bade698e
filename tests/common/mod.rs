//! Synthetic minidump construction for the integration tests.
//!
//! Streams are appended in file order; `finish` writes the stream
//! directory at the end of the file and patches the header to point at it.

#![allow(dead_code)]

pub const STREAM_THREAD_LIST: u32 = 3;
pub const STREAM_MODULE_LIST: u32 = 4;
pub const STREAM_MEMORY_LIST: u32 = 5;
pub const STREAM_EXCEPTION: u32 = 6;
pub const STREAM_SYSTEM_INFO: u32 = 7;
pub const STREAM_MEMORY64_LIST: u32 = 9;
pub const STREAM_HANDLE_DATA: u32 = 12;
pub const STREAM_UNLOADED_MODULES: u32 = 14;
pub const STREAM_MISC_INFO: u32 = 15;
pub const STREAM_MEMORY_INFO_LIST: u32 = 16;
pub const STREAM_THREAD_NAMES: u32 = 24;

pub const CONTEXT_SIZE: u32 = 1232;

pub struct DumpBuilder {
    data: Vec<u8>,
    streams: Vec<(u32, u32, u32)>,
}

impl DumpBuilder {
    pub fn new() -> Self {
        let mut data = Vec::new();
        data.extend_from_slice(&0x504D_444Du32.to_le_bytes());
        data.extend_from_slice(&0xA793u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // stream count, patched later
        data.extend_from_slice(&0u32.to_le_bytes()); // directory rva, patched later
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        Self {
            data,
            streams: Vec::new(),
        }
    }

    /// Appends raw bytes and returns their RVA.
    pub fn append(&mut self, bytes: &[u8]) -> u32 {
        let rva = self.data.len() as u32;
        self.data.extend_from_slice(bytes);
        rva
    }

    /// Appends a length-prefixed UTF-16LE string and returns its RVA.
    pub fn append_utf16(&mut self, text: &str) -> u32 {
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut bytes = Vec::with_capacity(4 + units.len() * 2);
        bytes.extend_from_slice(&((units.len() * 2) as u32).to_le_bytes());
        for unit in units {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        self.append(&bytes)
    }

    /// Appends a stream payload and records its directory entry.
    pub fn add_stream(&mut self, stream_type: u32, bytes: &[u8]) -> u32 {
        let rva = self.append(bytes);
        self.streams.push((stream_type, bytes.len() as u32, rva));
        rva
    }

    /// Records a directory entry without appending payload bytes.
    pub fn add_stream_entry(&mut self, stream_type: u32, size: u32, rva: u32) {
        self.streams.push((stream_type, size, rva));
    }

    /// Writes the directory and patches the header, yielding the dump.
    pub fn finish(mut self) -> Vec<u8> {
        let directory_rva = self.data.len() as u32;
        let count = self.streams.len() as u32;
        for (stream_type, size, rva) in &self.streams {
            self.data.extend_from_slice(&stream_type.to_le_bytes());
            self.data.extend_from_slice(&size.to_le_bytes());
            self.data.extend_from_slice(&rva.to_le_bytes());
        }
        self.data[8..12].copy_from_slice(&count.to_le_bytes());
        self.data[12..16].copy_from_slice(&directory_rva.to_le_bytes());
        self.data
    }

    /// As `finish`, but lies about the stream count.
    pub fn finish_with_stream_count(mut self, count: u32) -> Vec<u8> {
        let directory_rva = self.data.len() as u32;
        for (stream_type, size, rva) in &self.streams {
            self.data.extend_from_slice(&stream_type.to_le_bytes());
            self.data.extend_from_slice(&size.to_le_bytes());
            self.data.extend_from_slice(&rva.to_le_bytes());
        }
        self.data[8..12].copy_from_slice(&count.to_le_bytes());
        self.data[12..16].copy_from_slice(&directory_rva.to_le_bytes());
        self.data
    }
}

/// A 56-byte SystemInfo payload for an AMD64 Windows system.
pub fn system_info(major: u32, minor: u32, build: u32, csd_rva: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(56);
    bytes.extend_from_slice(&9u16.to_le_bytes()); // PROCESSOR_ARCHITECTURE_AMD64
    bytes.extend_from_slice(&6u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.push(8);
    bytes.push(1); // VER_NT_WORKSTATION
    bytes.extend_from_slice(&major.to_le_bytes());
    bytes.extend_from_slice(&minor.to_le_bytes());
    bytes.extend_from_slice(&build.to_le_bytes());
    bytes.extend_from_slice(&2u32.to_le_bytes()); // VER_PLATFORM_WIN32_NT
    bytes.extend_from_slice(&csd_rva.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    // CPU union: GenuineIntel, family 6 model 0x9A stepping 4.
    bytes.extend_from_slice(&0x756E_6547u32.to_le_bytes());
    bytes.extend_from_slice(&0x4965_6E69u32.to_le_bytes());
    bytes.extend_from_slice(&0x6C65_746Eu32.to_le_bytes());
    bytes.extend_from_slice(&0x0009_06A4u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes
}

/// A 168-byte Exception stream payload.
pub fn exception_stream(
    thread_id: u32,
    code: u32,
    address: u64,
    params: &[u64],
    context: (u32, u32),
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(168);
    bytes.extend_from_slice(&thread_id.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&code.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // flags
    bytes.extend_from_slice(&0u64.to_le_bytes()); // nested record
    bytes.extend_from_slice(&address.to_le_bytes());
    bytes.extend_from_slice(&(params.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    for index in 0..15 {
        let value = params.get(index).copied().unwrap_or(0);
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes.extend_from_slice(&context.0.to_le_bytes());
    bytes.extend_from_slice(&context.1.to_le_bytes());
    bytes
}

/// As [`exception_stream`], but with an explicit (possibly lying) count.
pub fn exception_stream_with_count(
    thread_id: u32,
    code: u32,
    address: u64,
    count: u32,
) -> Vec<u8> {
    let mut bytes = exception_stream(thread_id, code, address, &[], (0, 0));
    bytes[32..36].copy_from_slice(&count.to_le_bytes());
    bytes
}

/// A 48-byte thread record.
pub fn thread_record(
    thread_id: u32,
    stack_base: u64,
    stack_size: u32,
    stack_rva: u32,
    context: (u32, u32),
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(48);
    bytes.extend_from_slice(&thread_id.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // suspend count
    bytes.extend_from_slice(&0u32.to_le_bytes()); // priority class
    bytes.extend_from_slice(&0u32.to_le_bytes()); // priority
    bytes.extend_from_slice(&0u64.to_le_bytes()); // teb
    bytes.extend_from_slice(&stack_base.to_le_bytes());
    bytes.extend_from_slice(&stack_size.to_le_bytes());
    bytes.extend_from_slice(&stack_rva.to_le_bytes());
    bytes.extend_from_slice(&context.0.to_le_bytes());
    bytes.extend_from_slice(&context.1.to_le_bytes());
    bytes
}

/// A ThreadList payload from prebuilt 48-byte records.
pub fn thread_list(records: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for record in records {
        bytes.extend_from_slice(record);
    }
    bytes
}

/// A 1232-byte AMD64 CONTEXT with the walker-relevant registers set.
pub fn amd64_context(rip: u64, rsp: u64, rbp: u64) -> Vec<u8> {
    let mut bytes = vec![0u8; CONTEXT_SIZE as usize];
    bytes[48..52].copy_from_slice(&0x10_000Fu32.to_le_bytes()); // CONTEXT_ALL
    bytes[152..160].copy_from_slice(&rsp.to_le_bytes());
    bytes[160..168].copy_from_slice(&rbp.to_le_bytes());
    bytes[248..256].copy_from_slice(&rip.to_le_bytes());
    bytes
}

/// A 108-byte module record. Only the identity fields are populated.
pub fn module_record(base: u64, size: u32, name_rva: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; 108];
    bytes[0..8].copy_from_slice(&base.to_le_bytes());
    bytes[8..12].copy_from_slice(&size.to_le_bytes());
    bytes[12..16].copy_from_slice(&0xBEEFu32.to_le_bytes());
    bytes[16..20].copy_from_slice(&1_600_000_000u32.to_le_bytes());
    bytes[20..24].copy_from_slice(&name_rva.to_le_bytes());
    bytes
}

/// Overwrites a module record's CodeView location descriptor.
pub fn set_module_codeview(record: &mut [u8], size: u32, rva: u32) {
    record[76..80].copy_from_slice(&size.to_le_bytes());
    record[80..84].copy_from_slice(&rva.to_le_bytes());
}

/// A ModuleList payload from prebuilt 108-byte records.
pub fn module_list(records: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for record in records {
        bytes.extend_from_slice(record);
    }
    bytes
}

/// A Memory64List payload: header plus one descriptor per region.
pub fn memory64_list(base_rva: u64, regions: &[(u64, u64)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(regions.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&base_rva.to_le_bytes());
    for (start, size) in regions {
        bytes.extend_from_slice(&start.to_le_bytes());
        bytes.extend_from_slice(&size.to_le_bytes());
    }
    bytes
}

/// Builds the stack bytes for a frame-pointer chain test: a zeroed stack
/// with (saved RBP, return address) pairs written at the given offsets.
pub fn stack_with_frames(size: usize, frames: &[(usize, u64, u64)]) -> Vec<u8> {
    let mut bytes = vec![0u8; size];
    for &(offset, saved_rbp, return_addr) in frames {
        bytes[offset..offset + 8].copy_from_slice(&saved_rbp.to_le_bytes());
        bytes[offset + 8..offset + 16].copy_from_slice(&return_addr.to_le_bytes());
    }
    bytes
}
