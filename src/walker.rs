//! Call-stack reconstruction for a dumped thread.
//!
//! Without symbols or unwind tables the walker fuses three sources, in
//! decreasing order of trust: the exception/instruction-pointer addresses
//! from the saved context, the frame-pointer chain when the code honored
//! RBP chaining, and a heuristic scan of the captured stack for plausible
//! return addresses.

use std::collections::HashSet;

use bytemuck::pod_read_unaligned;

use crate::classify;
use crate::data::CONTEXT_AMD64;
use crate::parse::{CrashDump, Exception, Thread};

/// Hard cap on the reconstructed frame list.
pub const MAX_FRAMES: usize = 100;

// Frame-pointer chain iteration cap.
const MAX_CHAIN_STEPS: usize = 100;

// At most this many bytes of stack are scanned heuristically.
const MAX_SCAN_BYTES: u64 = 8192;

// At most this many frames may come from the heuristic scan.
const MAX_SCANNED_FRAMES: usize = 20;

// A module offset at or below this is unlikely to be a return site
// (headers, import thunks).
const SCAN_MIN_MODULE_OFFSET: u64 = 0x1000;

/// How a frame was recovered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameType {
    /// The faulting instruction itself (exception address or RIP).
    InstructionPointer,

    /// A return address found by walking the frame-pointer chain.
    FramePointer,

    /// A return address found by scanning the stack.
    ReturnAddress,
}

/// How trustworthy a frame is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameConfidence {
    High,
    Medium,
    Low,
}

/// One reconstructed stack frame.
///
/// Module identification is copied out of the dump so the frame list can
/// outlive borrows into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    /// The code address of the frame.
    pub address: u64,

    /// The base address of the containing module, when one resolved.
    pub module_base: Option<u64>,

    /// The recorded path of the containing module, when one resolved.
    pub module_path: Option<String>,

    /// The offset of the address inside the containing module.
    pub module_offset: Option<u64>,

    /// How the frame was recovered.
    pub frame_type: FrameType,

    /// How trustworthy the frame is.
    pub confidence: FrameConfidence,
}

impl StackFrame {
    /// Returns the file name of the containing module, when one resolved.
    pub fn module_name(&self) -> Option<&str> {
        self.module_path.as_deref().map(classify::short_name)
    }

    /// Renders the frame as `module+0xoffset`, or as a zero-padded hex
    /// literal when no module contains the address.
    pub fn resolved(&self) -> String {
        match (self.module_name(), self.module_offset) {
            (Some(name), Some(offset)) => format!("{name}+0x{offset:x}"),
            _ => format!("0x{:016x}", self.address),
        }
    }
}

// Accumulates frames, deduplicating by address.
struct FrameCollector {
    frames: Vec<StackFrame>,
    seen: HashSet<u64>,
}

impl FrameCollector {
    fn new() -> Self {
        Self {
            frames: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn contains(&self, address: u64) -> bool {
        self.seen.contains(&address)
    }

    fn push(
        &mut self,
        dump: &CrashDump<'_>,
        address: u64,
        frame_type: FrameType,
        confidence: FrameConfidence,
    ) -> bool {
        if !self.seen.insert(address) {
            return false;
        }

        let module = dump.module_containing(address);
        self.frames.push(StackFrame {
            address,
            module_base: module.map(|module| module.range.start),
            module_path: module.map(|module| module.path.clone()),
            module_offset: module.map(|module| address - module.range.start),
            frame_type,
            confidence,
        });
        true
    }
}

/// Reconstructs the call stack of `thread` from its AMD64 context.
///
/// The exception record, when present, contributes the highest-trust frame.
/// The result is deduplicated by address and capped at [`MAX_FRAMES`].
pub fn walk_stack(
    dump: &CrashDump<'_>,
    exception: Option<&Exception>,
    thread: &Thread,
    context: &CONTEXT_AMD64,
) -> Vec<StackFrame> {
    let mut collector = FrameCollector::new();

    // The faulting instruction, then RIP when it differs.
    if let Some(exception) = exception {
        collector.push(
            dump,
            exception.address,
            FrameType::InstructionPointer,
            FrameConfidence::High,
        );
    }
    if exception.is_none_or(|exception| exception.address != context.Rip) {
        collector.push(
            dump,
            context.Rip,
            FrameType::InstructionPointer,
            FrameConfidence::High,
        );
    }

    walk_frame_pointer_chain(dump, thread, context, &mut collector);
    scan_stack(dump, thread, context, &mut collector);

    let mut frames = collector.frames;
    frames.truncate(MAX_FRAMES);
    frames
}

// Follows saved-RBP links while they stay inside the captured stack and
// keep growing toward higher addresses.
fn walk_frame_pointer_chain(
    dump: &CrashDump<'_>,
    thread: &Thread,
    context: &CONTEXT_AMD64,
    collector: &mut FrameCollector,
) {
    let stack_base = thread.stack_base;
    let stack_end = thread.stack_end();

    let mut current = context.Rbp;
    for _ in 0..MAX_CHAIN_STEPS {
        let plausible = current >= stack_base
            && current < stack_end
            && current >= context.Rsp
            && current % 8 == 0;
        if !plausible {
            break;
        }

        let Some(bytes) = dump.read_at(current, 16) else {
            break;
        };
        if bytes.len() < 16 {
            break;
        }
        let saved_rbp: u64 = pod_read_unaligned(&bytes[..8]);
        let return_addr: u64 = pod_read_unaligned(&bytes[8..16]);

        if dump.module_containing(return_addr).is_some() {
            collector.push(
                dump,
                return_addr,
                FrameType::FramePointer,
                FrameConfidence::High,
            );
        }

        // The chain must move toward higher addresses or it is cyclic/garbage.
        if saved_rbp > current {
            current = saved_rbp;
        } else {
            break;
        }
    }
}

// Scans the stack above RSP for 8-byte words that land well inside a
// module. Words in system modules rank Medium, everything else Low.
fn scan_stack(
    dump: &CrashDump<'_>,
    thread: &Thread,
    context: &CONTEXT_AMD64,
    collector: &mut FrameCollector,
) {
    let available = thread.stack_end().saturating_sub(context.Rsp);
    let scan_size = available.min(MAX_SCAN_BYTES) as usize;
    if scan_size < 8 {
        return;
    }
    let Some(bytes) = dump.read_at(context.Rsp, scan_size) else {
        return;
    };

    let mut scanned = 0;
    for chunk in bytes.chunks_exact(8) {
        if scanned >= MAX_SCANNED_FRAMES {
            break;
        }

        let candidate: u64 = pod_read_unaligned(chunk);
        if collector.contains(candidate) {
            continue;
        }
        let Some(module) = dump.module_containing(candidate) else {
            continue;
        };
        if candidate - module.range.start <= SCAN_MIN_MODULE_OFFSET {
            continue;
        }

        let confidence = if classify::is_system(&module.path) {
            FrameConfidence::Medium
        } else {
            FrameConfidence::Low
        };
        if collector.push(dump, candidate, FrameType::ReturnAddress, confidence) {
            scanned += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_frame_display() {
        let frame = StackFrame {
            address: 0x1_4000_5000,
            module_base: Some(0x1_4000_0000),
            module_path: Some("C:\\Games\\engine.dll".to_string()),
            module_offset: Some(0x5000),
            frame_type: FrameType::FramePointer,
            confidence: FrameConfidence::High,
        };
        assert_eq!(frame.resolved(), "engine.dll+0x5000");

        let unresolved = StackFrame {
            module_base: None,
            module_path: None,
            module_offset: None,
            ..frame
        };
        assert_eq!(unresolved.resolved(), "0x0000000140005000");
    }
}
