//! Inline-hook heuristic.
//!
//! Detour libraries usually patch the first instruction of a function with a
//! jump or call into their trampoline, and debuggers plant `int3`. Looking at
//! the first byte catches the lazy cases. It is a signature check, not a
//! disassembler: hooks placed deeper in the function, or written with other
//! opcodes, are missed, and a function whose genuine prologue begins with one
//! of these bytes is reported as hooked.

/// `jmp rel32`
pub const OPCODE_JMP_NEAR: u8 = 0xE9;
/// `jmp rel8`
pub const OPCODE_JMP_SHORT: u8 = 0xEB;
/// `call rel32`
pub const OPCODE_CALL: u8 = 0xE8;
/// `int3` software breakpoint
pub const OPCODE_INT3: u8 = 0xCC;

const REDIRECTION_OPCODES: [u8; 4] = [OPCODE_JMP_NEAR, OPCODE_JMP_SHORT, OPCODE_CALL, OPCODE_INT3];

/// Capability answering whether a named function looks hooked.
pub trait HookProbe: Send + Sync {
    /// `true` when the function's entry matches a redirection signature.
    /// Unknown or unresolvable functions report `false`.
    fn is_function_potentially_hooked(&self, name: &str) -> bool;
}

/// Whether leading code bytes match a known redirection opcode.
pub fn entry_looks_hooked(entry: &[u8]) -> bool {
    entry
        .first()
        .is_some_and(|op| REDIRECTION_OPCODES.contains(op))
}

/// Probe that never reports a hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHookProbe;

impl HookProbe for NoHookProbe {
    fn is_function_potentially_hooked(&self, _name: &str) -> bool {
        false
    }
}

/// Probe that resolves functions already loaded in this process and
/// inspects their first byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolProbe;

impl HookProbe for SymbolProbe {
    fn is_function_potentially_hooked(&self, name: &str) -> bool {
        let Some(address) = resolve(name) else {
            tracing::debug!(function = name, "symbol not resolved, skipping hook check");
            return false;
        };
        let hooked = inspect(address);
        if hooked {
            tracing::warn!(function = name, "function entry looks redirected");
        }
        hooked
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn inspect(address: usize) -> bool {
    // SAFETY: `address` is the entry point of a function resolved from a
    // loaded image; code pages are mapped readable on every supported OS.
    let first = unsafe { std::ptr::read_volatile(address as *const u8) };
    entry_looks_hooked(&[first])
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn inspect(_address: usize) -> bool {
    false
}

#[cfg(unix)]
fn resolve(name: &str) -> Option<usize> {
    let symbol = std::ffi::CString::new(name).ok()?;
    // SAFETY: dlsym with RTLD_DEFAULT only reads the symbol tables of
    // already-loaded objects; `symbol` is NUL-terminated.
    let address = unsafe { libc::dlsym(libc::RTLD_DEFAULT, symbol.as_ptr()) };
    (!address.is_null()).then_some(address as usize)
}

#[cfg(windows)]
fn resolve(name: &str) -> Option<usize> {
    use std::ffi::{c_char, c_void, CString};

    #[link(name = "kernel32")]
    extern "system" {
        fn GetModuleHandleA(module_name: *const c_char) -> *mut c_void;
        fn GetProcAddress(module: *mut c_void, proc_name: *const c_char) -> *mut c_void;
    }

    let symbol = CString::new(name).ok()?;
    let modules: [&[u8]; 4] = [
        b"kernel32.dll\0",
        b"ws2_32.dll\0",
        b"winhttp.dll\0",
        b"ntdll.dll\0",
    ];
    modules.iter().find_map(|module| {
        // SAFETY: both arguments are NUL-terminated; GetModuleHandleA does not
        // load anything and returns null for modules not already mapped.
        unsafe {
            let handle = GetModuleHandleA(module.as_ptr() as *const c_char);
            if handle.is_null() {
                return None;
            }
            let address = GetProcAddress(handle, symbol.as_ptr());
            (!address.is_null()).then_some(address as usize)
        }
    })
}

#[cfg(not(any(unix, windows)))]
fn resolve(_name: &str) -> Option<usize> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirection_opcodes_flagged() {
        assert!(entry_looks_hooked(&[0xE9, 0x00, 0x00, 0x00, 0x00]));
        assert!(entry_looks_hooked(&[0xEB, 0xFE]));
        assert!(entry_looks_hooked(&[0xE8]));
        assert!(entry_looks_hooked(&[0xCC]));
    }

    #[test]
    fn ordinary_prologues_pass() {
        // endbr64
        assert!(!entry_looks_hooked(&[0xF3, 0x0F, 0x1E, 0xFA]));
        // push rbp; mov rbp, rsp
        assert!(!entry_looks_hooked(&[0x55, 0x48, 0x89, 0xE5]));
        // mov edi, edi (hot-patch prologue)
        assert!(!entry_looks_hooked(&[0x8B, 0xFF]));
    }

    #[test]
    fn empty_entry_is_not_hooked() {
        assert!(!entry_looks_hooked(&[]));
    }

    #[test]
    fn unknown_symbol_is_not_hooked() {
        assert!(!SymbolProbe.is_function_potentially_hooked("keyward_no_such_symbol_x"));
        assert!(!SymbolProbe.is_function_potentially_hooked("bad\0name"));
    }

    #[test]
    fn noop_probe_never_flags() {
        assert!(!NoHookProbe.is_function_potentially_hooked("connect"));
    }
}
