pub mod interpreter;
pub mod evaluator;
pub mod environment;
pub mod value;
pub mod hooks;
pub mod render;
pub mod builtins;

/// Severity of a `console.*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        }
    }
}

/// Observable effects of running a script that the host decides how to present.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeSideEffect {
    Console { level: ConsoleLevel, message: String },
    Alert(String),
    /// A timer was requested. Previews are headless, so it never fires.
    TimerScheduled {
        id: u64,
        delay_ms: f64,
        repeating: bool,
    },
    TimerCleared(u64),
}

pub use interpreter::*;
pub use evaluator::*;
pub use environment::*;
pub use value::*;
pub use hooks::*;
pub use render::*;
