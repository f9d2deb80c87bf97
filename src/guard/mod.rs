//! Best-effort anti-tamper checks consulted before every outbound request.
//!
//! Both checks are deterrents, not a security boundary. A failure only
//! aborts the request at hand; it never panics or poisons the session.

pub mod hook;
pub mod time;

use crate::errors::TamperSignal;
use crate::KeywardError;
use hook::HookProbe;
use std::sync::Arc;
use time::TimeGuard;

/// Time checkpoint plus hook heuristic over a fixed list of functions.
pub struct TamperGuard {
    time: Arc<TimeGuard>,
    probe: Box<dyn HookProbe>,
    guarded_functions: Vec<String>,
}

impl TamperGuard {
    /// Combine a time guard and a hook probe.
    pub fn new(
        time: Arc<TimeGuard>,
        probe: Box<dyn HookProbe>,
        guarded_functions: &[&str],
    ) -> Self {
        Self {
            time,
            probe,
            guarded_functions: guarded_functions.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Run only the clock rollback check.
    pub fn check_time(&self) -> Result<(), KeywardError> {
        self.time.check()
    }

    /// Run only the hook heuristic over the guarded functions.
    pub fn check_hooks(&self) -> Result<(), KeywardError> {
        match self
            .guarded_functions
            .iter()
            .find(|name| self.probe.is_function_potentially_hooked(name))
        {
            Some(name) => Err(KeywardError::TamperDetected(TamperSignal::HookedFunction(
                name.clone(),
            ))),
            None => Ok(()),
        }
    }

    /// Run both checks, time first.
    pub fn check(&self) -> Result<(), KeywardError> {
        self.check_time()?;
        self.check_hooks()
    }
}

impl std::fmt::Debug for TamperGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TamperGuard")
            .field("time", &self.time)
            .field("guarded_functions", &self.guarded_functions)
            .finish()
    }
}
