//! Module classification.
//!
//! A static database partitioning loaded modules into four categories used
//! by the blame analyzer. Graphics drivers are recognized before the
//! Windows system set, so a vendor driver living under `\Windows\System32`
//! still classifies (and blames) as a driver.

/// The category a module falls into for blame purposes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModuleCategory {
    /// Windows core libraries; never blamed.
    System,

    /// GPU vendor drivers (Intel, NVIDIA, AMD/ATI, Vulkan loader).
    GraphicsDriver,

    /// Modules installed under Program Files / ProgramData.
    Application,

    /// Everything else.
    ThirdParty,
}

impl ModuleCategory {
    /// Returns true when a crash inside this category is worth blaming on
    /// the module. Only the Windows system set is exempt.
    pub fn should_blame(self) -> bool {
        !matches!(self, ModuleCategory::System)
    }
}

// Windows core DLL stems. Kept sorted for readability; matched exactly
// against the lowercased file stem.
static SYSTEM_MODULES: &[&str] = &[
    "advapi32",
    "bcrypt",
    "bcryptprimitives",
    "cfgmgr32",
    "clr",
    "clrjit",
    "combase",
    "coreclr",
    "crypt32",
    "d2d1",
    "d3d10",
    "d3d10_1",
    "d3d11",
    "d3d12",
    "d3d9",
    "dbghelp",
    "dcomp",
    "dwrite",
    "dxgi",
    "gdi32",
    "gdi32full",
    "imagehlp",
    "imm32",
    "kernel32",
    "kernelbase",
    "mf",
    "mfplat",
    "mfreadwrite",
    "mscoreei",
    "mscorwks",
    "msctf",
    "msvcrt",
    "ntdll",
    "ntmarta",
    "ole32",
    "oleaut32",
    "powrprof",
    "profapi",
    "propsys",
    "psapi",
    "rpcrt4",
    "sechost",
    "setupapi",
    "shcore",
    "shell32",
    "shlwapi",
    "ucrtbase",
    "urlmon",
    "user32",
    "version",
    "win32u",
    "windowscodecs",
    "winhttp",
    "wininet",
    "wintrust",
    "ws2_32",
];

// System DLL families matched by prefix (vcruntime140, msvcp140d, ...).
static SYSTEM_PREFIXES: &[&str] = &["vcruntime", "msvcp"];

// Graphics driver stems matched by prefix, per GPU vendor.
static GRAPHICS_PREFIXES: &[&str] = &[
    // Intel
    "igxelp", "ig9", "igd", "igc", "igdumdim", // NVIDIA
    "nvogl", "nvd3d", "nvwgf2", "nvcuda", "nvapi", "nvumdshimx", "nvldumdx", "nvopencl",
    // AMD / ATI
    "ati", "amd",
];

// Graphics driver stems matched exactly.
static GRAPHICS_MODULES: &[&str] = &[
    "igdusc64",
    "intelocl64",
    "igdfcl64",
    "nvinit",
    "vulkan-1",
];

static WINDOWS_PATHS: &[&str] = &[
    "\\windows\\system32\\",
    "\\windows\\syswow64\\",
    "\\windows\\winsxs\\",
];

static APPLICATION_PATHS: &[&str] = &["\\program files", "\\programdata"];

/// Returns the short name of a module: the substring after the last `\`
/// or `/` of its path.
pub fn short_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Classifies a module by its full path (or bare file name).
pub fn category(path: &str) -> ModuleCategory {
    let lower = path.to_ascii_lowercase();
    let stem = file_stem(short_name(&lower));

    if GRAPHICS_MODULES.contains(&stem)
        || GRAPHICS_PREFIXES.iter().any(|prefix| stem.starts_with(prefix))
    {
        return ModuleCategory::GraphicsDriver;
    }

    if SYSTEM_MODULES.binary_search(&stem).is_ok()
        || SYSTEM_PREFIXES.iter().any(|prefix| stem.starts_with(prefix))
        || WINDOWS_PATHS.iter().any(|dir| lower.contains(dir))
    {
        return ModuleCategory::System;
    }

    if APPLICATION_PATHS.iter().any(|dir| lower.contains(dir)) {
        return ModuleCategory::Application;
    }

    ModuleCategory::ThirdParty
}

/// Returns true only for the Windows system set. Graphics drivers are
/// deliberately not "system" for blame purposes, regardless of where they
/// are installed.
pub fn is_system(path: &str) -> bool {
    category(path) == ModuleCategory::System
}

fn file_stem(name: &str) -> &str {
    name.strip_suffix(".dll")
        .or_else(|| name.strip_suffix(".exe"))
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_table_is_sorted() {
        for window in SYSTEM_MODULES.windows(2) {
            assert!(window[0] < window[1], "out of order: {}", window[1]);
        }
    }

    #[test]
    fn short_name_splits_on_both_separators() {
        assert_eq!(short_name("C:\\Windows\\System32\\ntdll.dll"), "ntdll.dll");
        assert_eq!(short_name("C:/Games/engine.dll"), "engine.dll");
        assert_eq!(short_name("plain.dll"), "plain.dll");
    }

    #[test]
    fn core_dlls_are_system() {
        assert_eq!(category("C:\\Windows\\System32\\ntdll.dll"), ModuleCategory::System);
        assert_eq!(category("KERNELBASE.dll"), ModuleCategory::System);
        assert_eq!(category("vcruntime140.dll"), ModuleCategory::System);
        assert_eq!(category("msvcp140_atomic_wait.dll"), ModuleCategory::System);
        assert!(is_system("C:\\Windows\\SysWOW64\\mystery.dll"));
    }

    #[test]
    fn graphics_drivers_win_over_their_system32_location() {
        assert_eq!(
            category("C:\\Windows\\System32\\DriverStore\\nvoglv64.dll"),
            ModuleCategory::GraphicsDriver
        );
        assert_eq!(category("atidxx64.dll"), ModuleCategory::GraphicsDriver);
        assert_eq!(category("amdvlk64.dll"), ModuleCategory::GraphicsDriver);
        assert_eq!(category("igd10iumd64.dll"), ModuleCategory::GraphicsDriver);
        assert_eq!(category("vulkan-1.dll"), ModuleCategory::GraphicsDriver);
        assert!(!is_system("C:\\Windows\\System32\\nvoglv64.dll"));
    }

    #[test]
    fn application_and_third_party_fall_through() {
        assert_eq!(
            category("C:\\Program Files\\Contoso\\app.exe"),
            ModuleCategory::Application
        );
        assert_eq!(
            category("C:\\ProgramData\\Contoso\\hook.dll"),
            ModuleCategory::Application
        );
        assert_eq!(category("C:\\Games\\custom\\engine.dll"), ModuleCategory::ThirdParty);
    }

    #[test]
    fn only_system_is_exempt_from_blame() {
        assert!(!ModuleCategory::System.should_blame());
        assert!(ModuleCategory::GraphicsDriver.should_blame());
        assert!(ModuleCategory::Application.should_blame());
        assert!(ModuleCategory::ThirdParty.should_blame());
    }
}
