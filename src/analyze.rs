//! Crash analysis: blame assignment and the human-readable verdict.
//!
//! Analysis borrows a parsed dump, walks the faulting thread's stack, and
//! produces a [`CrashAnalysis`] that owns everything it exposes.

use crate::classify::{self, ModuleCategory};
use crate::parse::{CrashDump, Exception};
use crate::status;
use crate::walker::{self, FrameConfidence, FrameType, StackFrame};

/// Why a module was blamed for the crash.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlameReason {
    /// A graphics driver appeared near the top of the call stack.
    GraphicsDriver,

    /// The crash occurred directly inside the module.
    DirectCrash,

    /// The module is the first non-system code on the call stack.
    FirstNonSystemFrame,
}

impl BlameReason {
    /// Returns a short sentence fragment describing the reason.
    pub fn description(self) -> &'static str {
        match self {
            BlameReason::GraphicsDriver => "a graphics driver is near the top of the call stack",
            BlameReason::DirectCrash => "the crash occurred directly in this module",
            BlameReason::FirstNonSystemFrame => {
                "this is the first non-system module on the call stack"
            }
        }
    }
}

/// The module the analyzer holds responsible for the crash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blame {
    /// The recorded path of the blamed module.
    pub module_path: String,

    /// The base address of the blamed module.
    pub module_base: u64,

    /// The classification of the blamed module.
    pub category: ModuleCategory,

    /// Why the module was blamed.
    pub reason: BlameReason,

    /// The index of the frame that triggered the blame.
    pub frame_index: usize,
}

impl Blame {
    /// Returns the file name of the blamed module.
    pub fn module_name(&self) -> &str {
        classify::short_name(&self.module_path)
    }
}

/// Overall confidence in the reconstructed analysis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnalysisConfidence {
    Low,
    Medium,
    High,
}

/// The human-readable half of an analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrashSummary {
    /// The NT status code of the exception.
    pub exception_code: u32,

    /// The symbolic name of the exception code.
    pub exception_name: String,

    /// The reference description of the exception code.
    pub exception_description: &'static str,

    /// The analyzer's best explanation of what went wrong.
    pub probable_cause: String,

    /// What the user should try next.
    pub recommendation: String,
}

/// The result of analyzing a parsed dump: an owned frame list, an optional
/// blame verdict, the summary text, and a confidence grade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrashAnalysis {
    frames: Vec<StackFrame>,
    blame: Option<Blame>,
    summary: CrashSummary,
    confidence: AnalysisConfidence,
}

impl CrashAnalysis {
    /// Returns the reconstructed stack frames, most trusted first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Returns the blamed module, when one was identified.
    pub fn blame(&self) -> Option<&Blame> {
        self.blame.as_ref()
    }

    /// Returns the summary block.
    pub fn summary(&self) -> &CrashSummary {
        &self.summary
    }

    /// Returns the analyzer's best explanation of what went wrong.
    pub fn probable_cause(&self) -> &str {
        &self.summary.probable_cause
    }

    /// Returns what the user should try next.
    pub fn recommendation(&self) -> &str {
        &self.summary.recommendation
    }

    /// Returns the confidence grade of the analysis.
    pub fn confidence(&self) -> AnalysisConfidence {
        self.confidence
    }
}

/// Analyzes a parsed dump.
///
/// Returns `None` only when no exception was captured or the faulting
/// thread has no decoded AMD64 context to walk from.
pub fn analyze(dump: &CrashDump<'_>) -> Option<CrashAnalysis> {
    let exception = dump.exception()?;
    let thread = dump.faulting_thread()?;
    let context = thread.context()?.as_amd64()?;

    let frames = walker::walk_stack(dump, Some(exception), thread, context);
    let blame = assign_blame(dump, exception, &frames);
    let confidence = score_confidence(&frames);

    let summary = CrashSummary {
        exception_code: exception.code,
        exception_name: exception.code_name(),
        exception_description: exception.code_description(),
        probable_cause: probable_cause(exception, blame.as_ref()),
        recommendation: recommendation(blame.as_ref()),
    };

    Some(CrashAnalysis {
        frames,
        blame,
        summary,
        confidence,
    })
}

// Blame priority: a graphics driver near the top, then a non-system first
// frame, then the first non-system frame anywhere, then the module holding
// the exception address.
fn assign_blame(
    dump: &CrashDump<'_>,
    exception: &Exception,
    frames: &[StackFrame],
) -> Option<Blame> {
    for (index, frame) in frames.iter().take(5).enumerate() {
        if let Some(path) = frame.module_path.as_deref() {
            if classify::category(path) == ModuleCategory::GraphicsDriver {
                return blame_frame(frame, index, BlameReason::GraphicsDriver);
            }
        }
    }

    if let Some(first) = frames.first() {
        if let Some(path) = first.module_path.as_deref() {
            if !classify::is_system(path) {
                return blame_frame(first, 0, BlameReason::DirectCrash);
            }
        }
    }

    for (index, frame) in frames.iter().enumerate() {
        if let Some(path) = frame.module_path.as_deref() {
            if !classify::is_system(path) {
                return blame_frame(frame, index, BlameReason::FirstNonSystemFrame);
            }
        }
    }

    let module = dump.module_containing(exception.address)?;
    let index = frames
        .iter()
        .position(|frame| frame.module_base == Some(module.range.start))?;
    blame_frame(&frames[index], index, BlameReason::DirectCrash)
}

fn blame_frame(frame: &StackFrame, index: usize, reason: BlameReason) -> Option<Blame> {
    let path = frame.module_path.clone()?;
    Some(Blame {
        category: classify::category(&path),
        module_path: path,
        module_base: frame.module_base?,
        reason,
        frame_index: index,
    })
}

// The exception code picks the explanation; unlisted codes fall back to the
// blame verdict, then to the NT status description.
fn probable_cause(exception: &Exception, blame: Option<&Blame>) -> String {
    match exception.code {
        status::EXCEPTION_ACCESS_VIOLATION => exception
            .access_violation_details()
            .unwrap_or_else(|| "Invalid memory access".to_string()),
        status::EXCEPTION_STACK_OVERFLOW => {
            "Stack overflow – excessive recursion or large stack allocations".to_string()
        }
        status::EXCEPTION_INT_DIVIDE_BY_ZERO => {
            "Division by zero in integer arithmetic".to_string()
        }
        status::EXCEPTION_STACK_BUFFER_OVERRUN => {
            "Security check failure – buffer overrun detected".to_string()
        }
        status::EXCEPTION_MSVC_CPP => "Unhandled C++ exception".to_string(),
        code => match blame {
            Some(blame) => format!(
                "Exception in {}: {}",
                blame.module_name(),
                blame.reason.description()
            ),
            None => status::description(code).to_string(),
        },
    }
}

fn recommendation(blame: Option<&Blame>) -> String {
    match blame {
        Some(blame) => match blame.category {
            ModuleCategory::GraphicsDriver => {
                "Update your graphics drivers to the latest version from the GPU vendor."
                    .to_string()
            }
            ModuleCategory::ThirdParty => format!(
                "Check for updates to {}; a newer build may fix this crash.",
                blame.module_name()
            ),
            ModuleCategory::Application => {
                "This looks like a bug in the application code; report it to the application vendor."
                    .to_string()
            }
            ModuleCategory::System => {
                "Check for Windows updates or hardware issues.".to_string()
            }
        },
        None => "Analyze the stack trace and module list for more context.".to_string(),
    }
}

// High needs a solid frame-pointer chain; a couple of trusted frames still
// rate Medium.
fn score_confidence(frames: &[StackFrame]) -> AnalysisConfidence {
    let frame_pointer = frames
        .iter()
        .filter(|frame| frame.frame_type == FrameType::FramePointer)
        .count();
    let high = frames
        .iter()
        .filter(|frame| frame.confidence == FrameConfidence::High)
        .count();

    if frame_pointer >= 3 && high >= 4 {
        AnalysisConfidence::High
    } else if high >= 2 || frame_pointer >= 1 {
        AnalysisConfidence::Medium
    } else {
        AnalysisConfidence::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MINIDUMP_LOCATION_DESCRIPTOR;

    fn frame(
        address: u64,
        module: Option<(&str, u64)>,
        frame_type: FrameType,
        confidence: FrameConfidence,
    ) -> StackFrame {
        StackFrame {
            address,
            module_base: module.map(|(_, base)| base),
            module_path: module.map(|(path, _)| path.to_string()),
            module_offset: module.map(|(_, base)| address - base),
            frame_type,
            confidence,
        }
    }

    fn exception(code: u32) -> Exception {
        Exception {
            thread_id: 1,
            code,
            flags: 0,
            nested_record: 0,
            address: 0x1_4000_1000,
            parameters: Vec::new(),
            context_location: MINIDUMP_LOCATION_DESCRIPTOR { DataSize: 0, RVA: 0 },
        }
    }

    #[test]
    fn confidence_thresholds() {
        let high = vec![
            frame(1, None, FrameType::InstructionPointer, FrameConfidence::High),
            frame(2, None, FrameType::FramePointer, FrameConfidence::High),
            frame(3, None, FrameType::FramePointer, FrameConfidence::High),
            frame(4, None, FrameType::FramePointer, FrameConfidence::High),
        ];
        assert_eq!(score_confidence(&high), AnalysisConfidence::High);

        let medium = vec![
            frame(1, None, FrameType::InstructionPointer, FrameConfidence::High),
            frame(2, None, FrameType::InstructionPointer, FrameConfidence::High),
        ];
        assert_eq!(score_confidence(&medium), AnalysisConfidence::Medium);

        let single_chain = vec![frame(
            1,
            None,
            FrameType::FramePointer,
            FrameConfidence::High,
        )];
        assert_eq!(score_confidence(&single_chain), AnalysisConfidence::Medium);

        let low = vec![frame(
            1,
            None,
            FrameType::ReturnAddress,
            FrameConfidence::Low,
        )];
        assert_eq!(score_confidence(&low), AnalysisConfidence::Low);
        assert!(AnalysisConfidence::Medium >= AnalysisConfidence::Low);
    }

    #[test]
    fn probable_cause_by_code() {
        assert_eq!(
            probable_cause(&exception(0xC000_00FD), None),
            "Stack overflow – excessive recursion or large stack allocations"
        );
        assert_eq!(
            probable_cause(&exception(0xC000_0094), None),
            "Division by zero in integer arithmetic"
        );
        assert_eq!(
            probable_cause(&exception(0xE06D_7363), None),
            "Unhandled C++ exception"
        );
        // Access violation without parameters degrades to the generic text.
        assert_eq!(
            probable_cause(&exception(0xC000_0005), None),
            "Invalid memory access"
        );
        // Unlisted codes without blame fall back to the NT description.
        assert_eq!(
            probable_cause(&exception(0xC000_0374), None),
            "A heap has been corrupted."
        );
    }

    #[test]
    fn probable_cause_names_the_blamed_module() {
        let blame = Blame {
            module_path: "C:\\Games\\engine.dll".to_string(),
            module_base: 0x1000,
            category: ModuleCategory::ThirdParty,
            reason: BlameReason::DirectCrash,
            frame_index: 0,
        };
        let cause = probable_cause(&exception(0xC000_001D), Some(&blame));
        assert!(cause.starts_with("Exception in engine.dll:"), "{cause}");
    }

    #[test]
    fn recommendation_by_category() {
        let blame = |category| Blame {
            module_path: "C:\\thing\\mod.dll".to_string(),
            module_base: 0,
            category,
            reason: BlameReason::DirectCrash,
            frame_index: 0,
        };

        assert!(
            recommendation(Some(&blame(ModuleCategory::GraphicsDriver)))
                .contains("graphics drivers")
        );
        assert!(recommendation(Some(&blame(ModuleCategory::ThirdParty))).contains("mod.dll"));
        assert!(
            recommendation(Some(&blame(ModuleCategory::Application)))
                .contains("bug in the application code")
        );
        assert!(
            recommendation(Some(&blame(ModuleCategory::System)))
                .contains("Windows updates or hardware issues")
        );
        assert!(recommendation(None).contains("stack trace"));
    }

    #[test]
    fn graphics_driver_blame_wins_in_the_first_frames() {
        let frames = vec![
            frame(
                0x10,
                Some(("C:\\Windows\\System32\\ntdll.dll", 0x0)),
                FrameType::InstructionPointer,
                FrameConfidence::High,
            ),
            frame(
                0x1_0000_5000,
                Some(("C:\\Windows\\System32\\nvoglv64.dll", 0x1_0000_0000)),
                FrameType::FramePointer,
                FrameConfidence::High,
            ),
        ];

        // No dump needed before the fallback rule; build a minimal one.
        let header = crate::tests_support::minimal_dump_bytes();
        let dump = CrashDump::parse(&header).unwrap();

        let blame = assign_blame(&dump, &exception(0xC000_0005), &frames).unwrap();
        assert_eq!(blame.reason, BlameReason::GraphicsDriver);
        assert_eq!(blame.category, ModuleCategory::GraphicsDriver);
        assert_eq!(blame.frame_index, 1);
        assert_eq!(blame.module_name(), "nvoglv64.dll");
    }

    #[test]
    fn first_non_system_frame_blame() {
        let frames = vec![
            frame(
                0x10,
                Some(("C:\\Windows\\System32\\ntdll.dll", 0x0)),
                FrameType::InstructionPointer,
                FrameConfidence::High,
            ),
            frame(
                0x2_0000_6000,
                Some(("C:\\Games\\engine.dll", 0x2_0000_0000)),
                FrameType::ReturnAddress,
                FrameConfidence::Low,
            ),
        ];

        let header = crate::tests_support::minimal_dump_bytes();
        let dump = CrashDump::parse(&header).unwrap();

        let blame = assign_blame(&dump, &exception(0xC000_0005), &frames).unwrap();
        assert_eq!(blame.reason, BlameReason::FirstNonSystemFrame);
        assert_eq!(blame.frame_index, 1);
    }
}
