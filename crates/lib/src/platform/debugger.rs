//! Debugger detection.
//!
//! Interleaved output from parallel jobs makes stepping through a build
//! painful, so the scheduler falls back to serial execution when a debugger
//! is attached.

/// True if a debugger is attached to this process.
#[cfg(target_os = "linux")]
pub fn debugger_attached() -> bool {
  std::fs::read_to_string("/proc/self/status")
    .ok()
    .and_then(|status| tracer_pid(&status))
    .is_some_and(|pid| pid != 0)
}

#[cfg(windows)]
pub fn debugger_attached() -> bool {
  // SAFETY: IsDebuggerPresent takes no arguments and only reads process state.
  unsafe { windows_sys::Win32::System::Diagnostics::Debug::IsDebuggerPresent() != 0 }
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn debugger_attached() -> bool {
  false
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn tracer_pid(status: &str) -> Option<u32> {
  status
    .lines()
    .find_map(|line| line.strip_prefix("TracerPid:"))
    .and_then(|value| value.trim().parse().ok())
}
