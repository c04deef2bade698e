//! Decoded thread register state.
//!
//! A thread's saved `CONTEXT` lives behind a location descriptor in the
//! dump; this module decodes it record-exactly for x64 and x86. ARM64
//! contexts are noted as present but not decoded register-by-register.

use std::io::{Cursor, SeekFrom, Seek};

use binrw::BinRead;

use crate::data::{
    CONTEXT_AMD64, CONTEXT_AMD64_SIZE, CONTEXT_HAS_FLOATING_POINT, CONTEXT_X86, CONTEXT_X86_SIZE,
    MINIDUMP_LOCATION_DESCRIPTOR,
};
use crate::parse::Arch;

/// Represents the processor context of a thread captured in the minidump.
///
/// The `ThreadContext` enum encapsulates the architecture-specific context
/// data, such as register states, for threads in the captured process.
#[derive(Debug, Clone)]
pub enum ThreadContext {
    /// Represents the 64-bit processor context (`CONTEXT_AMD64`) for the thread.
    Amd64(Box<CONTEXT_AMD64>),

    /// Represents the 32-bit processor context (`CONTEXT_X86`) for the thread.
    X86(Box<CONTEXT_X86>),

    /// An ARM64 context was captured; only its presence is recorded.
    Arm64,
}

impl ThreadContext {
    /// Returns the decoded AMD64 context, if that is what this thread carries.
    pub fn as_amd64(&self) -> Option<&CONTEXT_AMD64> {
        match self {
            ThreadContext::Amd64(context) => Some(context),
            _ => None,
        }
    }

    /// Returns the decoded x86 context, if that is what this thread carries.
    pub fn as_x86(&self) -> Option<&CONTEXT_X86> {
        match self {
            ThreadContext::X86(context) => Some(context),
            _ => None,
        }
    }

    /// Returns the instruction pointer, for the architectures that decode one.
    pub fn instruction_pointer(&self) -> Option<u64> {
        match self {
            ThreadContext::Amd64(context) => Some(context.Rip),
            ThreadContext::X86(context) => Some(context.Eip.into()),
            ThreadContext::Arm64 => None,
        }
    }

    /// Returns the stack pointer, for the architectures that decode one.
    pub fn stack_pointer(&self) -> Option<u64> {
        match self {
            ThreadContext::Amd64(context) => Some(context.Rsp),
            ThreadContext::X86(context) => Some(context.Esp.into()),
            ThreadContext::Arm64 => None,
        }
    }
}

/// Decodes the saved context a location descriptor points at.
///
/// The location's size must cover the architecture's full serialized
/// `CONTEXT` and the range must lie inside the blob; anything else yields
/// `None`, leaving the owning thread without a context but otherwise
/// intact.
pub(crate) fn decode_context(
    buffer: &[u8],
    arch: Arch,
    location: &MINIDUMP_LOCATION_DESCRIPTOR,
) -> Option<ThreadContext> {
    let rva = location.RVA as u64;
    let size = location.DataSize as u64;
    let end = rva.checked_add(size)?;
    if end > buffer.len() as u64 {
        return None;
    }

    let mut cursor = Cursor::new(buffer);
    cursor.seek(SeekFrom::Start(rva)).ok()?;

    match arch {
        Arch::Amd64 => {
            if location.DataSize < CONTEXT_AMD64_SIZE {
                return None;
            }
            let context = CONTEXT_AMD64::read(&mut cursor).ok()?;
            Some(ThreadContext::Amd64(Box::new(context)))
        }
        Arch::X86 | Arch::X86OnWin64 => {
            if location.DataSize < CONTEXT_X86_SIZE {
                return None;
            }
            let context = CONTEXT_X86::read(&mut cursor).ok()?;
            Some(ThreadContext::X86(Box::new(context)))
        }
        Arch::Arm64 => Some(ThreadContext::Arm64),
        _ => None,
    }
}

bitflags::bitflags! {
    /// The EFLAGS/RFLAGS status and control bits the analyzer reports.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct EFlags: u32 {
        /// Carry flag.
        const CF = 1 << 0;
        /// Parity flag.
        const PF = 1 << 2;
        /// Auxiliary carry flag.
        const AF = 1 << 4;
        /// Zero flag.
        const ZF = 1 << 6;
        /// Sign flag.
        const SF = 1 << 7;
        /// Trap flag.
        const TF = 1 << 8;
        /// Interrupt enable flag.
        const IF = 1 << 9;
        /// Direction flag.
        const DF = 1 << 10;
        /// Overflow flag.
        const OF = 1 << 11;
    }
}

impl EFlags {
    /// Returns the names of the set flags, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

impl CONTEXT_AMD64 {
    /// Returns the decoded EFLAGS bits, ignoring reserved positions.
    pub fn eflags(&self) -> EFlags {
        EFlags::from_bits_truncate(self.EFlags)
    }

    /// Returns XMM0..15, present only when the context flags mark the
    /// FXSAVE area as valid.
    pub fn xmm(&self) -> Option<[u128; 16]> {
        if self.ContextFlags & CONTEXT_HAS_FLOATING_POINT == 0 {
            return None;
        }
        Some([
            self.Xmm0, self.Xmm1, self.Xmm2, self.Xmm3, self.Xmm4, self.Xmm5, self.Xmm6,
            self.Xmm7, self.Xmm8, self.Xmm9, self.Xmm10, self.Xmm11, self.Xmm12, self.Xmm13,
            self.Xmm14, self.Xmm15,
        ])
    }

    /// Returns the general-purpose registers as name/value pairs, in the
    /// order a debugger lists them.
    pub fn general_registers(&self) -> [(&'static str, u64); 17] {
        [
            ("rax", self.Rax),
            ("rcx", self.Rcx),
            ("rdx", self.Rdx),
            ("rbx", self.Rbx),
            ("rsp", self.Rsp),
            ("rbp", self.Rbp),
            ("rsi", self.Rsi),
            ("rdi", self.Rdi),
            ("r8", self.R8),
            ("r9", self.R9),
            ("r10", self.R10),
            ("r11", self.R11),
            ("r12", self.R12),
            ("r13", self.R13),
            ("r14", self.R14),
            ("r15", self.R15),
            ("rip", self.Rip),
        ]
    }

    /// Returns the segment registers as name/value pairs.
    pub fn segment_registers(&self) -> [(&'static str, u16); 6] {
        [
            ("cs", self.SegCs),
            ("ds", self.SegDs),
            ("es", self.SegEs),
            ("fs", self.SegFs),
            ("gs", self.SegGs),
            ("ss", self.SegSs),
        ]
    }

    /// Returns the debug registers as name/value pairs.
    pub fn debug_registers(&self) -> [(&'static str, u64); 6] {
        [
            ("dr0", self.Dr0),
            ("dr1", self.Dr1),
            ("dr2", self.Dr2),
            ("dr3", self.Dr3),
            ("dr6", self.Dr6),
            ("dr7", self.Dr7),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amd64_context_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; CONTEXT_AMD64_SIZE as usize];
        // ContextFlags at 48, EFLAGS at 68, Rsp at 152, Rip at 248.
        bytes[48..52].copy_from_slice(&CONTEXT_HAS_FLOATING_POINT.to_le_bytes());
        bytes[68..72].copy_from_slice(&0x245u32.to_le_bytes());
        bytes[152..160].copy_from_slice(&0x7FFE_0000u64.to_le_bytes());
        bytes[248..256].copy_from_slice(&0x1400_01000u64.to_le_bytes());
        // Xmm3 at 416 + 3 * 16.
        bytes[464..480].copy_from_slice(&7u128.to_le_bytes());
        bytes
    }

    #[test]
    fn decodes_amd64_register_offsets() {
        let bytes = amd64_context_bytes();
        let location = MINIDUMP_LOCATION_DESCRIPTOR {
            DataSize: bytes.len() as u32,
            RVA: 0,
        };

        let context = decode_context(&bytes, Arch::Amd64, &location).unwrap();
        let amd64 = context.as_amd64().unwrap();
        assert_eq!(amd64.Rsp, 0x7FFE_0000);
        assert_eq!(amd64.Rip, 0x1400_01000);
        assert_eq!(context.instruction_pointer(), Some(0x1400_01000));
        assert_eq!(amd64.xmm().unwrap()[3], 7);
    }

    #[test]
    fn xmm_absent_without_floating_point_flag() {
        let mut bytes = amd64_context_bytes();
        bytes[48..52].copy_from_slice(&0u32.to_le_bytes());
        let location = MINIDUMP_LOCATION_DESCRIPTOR {
            DataSize: bytes.len() as u32,
            RVA: 0,
        };

        let context = decode_context(&bytes, Arch::Amd64, &location).unwrap();
        assert!(context.as_amd64().unwrap().xmm().is_none());
    }

    #[test]
    fn short_or_out_of_range_context_is_absent() {
        let bytes = amd64_context_bytes();

        let short = MINIDUMP_LOCATION_DESCRIPTOR {
            DataSize: CONTEXT_AMD64_SIZE - 1,
            RVA: 0,
        };
        assert!(decode_context(&bytes, Arch::Amd64, &short).is_none());

        let outside = MINIDUMP_LOCATION_DESCRIPTOR {
            DataSize: CONTEXT_AMD64_SIZE,
            RVA: 64,
        };
        assert!(decode_context(&bytes, Arch::Amd64, &outside).is_none());
    }

    #[test]
    fn arm64_presence_is_noted() {
        let location = MINIDUMP_LOCATION_DESCRIPTOR {
            DataSize: 16,
            RVA: 0,
        };
        let context = decode_context(&[0u8; 16], Arch::Arm64, &location).unwrap();
        assert!(matches!(context, ThreadContext::Arm64));
        assert_eq!(context.instruction_pointer(), None);
    }

    #[test]
    fn eflags_names_in_bit_order() {
        let flags = EFlags::from_bits_truncate(0b1100_0101);
        assert_eq!(flags.names(), vec!["CF", "PF", "ZF", "SF"]);
    }
}
