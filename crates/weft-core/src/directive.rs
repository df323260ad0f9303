use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::error::EngineError;

/// Clock injected into time-based directives so rendering stays a pure
/// function of its inputs.
pub type ClockFn = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// An embedded template instruction beyond plain variable substitution,
/// written as `{{plugin:<name>:<args>}}`. Resolution must be free of
/// ambient state; anything a directive needs is injected at construction.
pub trait Directive: Send + Sync {
    fn name(&self) -> &str;
    fn resolve(&self, args: &str) -> Result<String, EngineError>;
}

pub struct DirectiveRegistry {
    entries: HashMap<String, Arc<dyn Directive>>,
}

impl DirectiveRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The built-in set with the system clock.
    pub fn builtin() -> Self {
        Self::builtin_with_clock(Arc::new(Local::now))
    }

    pub fn builtin_with_clock(clock: ClockFn) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(DatetimeDirective { clock }));
        registry.register(Arc::new(TextDirective));
        registry
    }

    pub fn register(&mut self, directive: Arc<dyn Directive>) {
        self.entries.insert(directive.name().to_string(), directive);
    }

    pub fn resolve(&self, name: &str, args: &str) -> Result<String, EngineError> {
        match self.entries.get(name) {
            Some(directive) => directive.resolve(args),
            None => Err(EngineError::UnknownDirective(name.to_string())),
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

struct DatetimeDirective {
    clock: ClockFn,
}

impl Directive for DatetimeDirective {
    fn name(&self) -> &str {
        "datetime"
    }

    fn resolve(&self, args: &str) -> Result<String, EngineError> {
        let now = (self.clock)();
        let formatted = match args {
            "" | "now" => now.format("%Y-%m-%d %H:%M:%S").to_string(),
            "today" => now.format("%Y-%m-%d").to_string(),
            "time" => now.format("%H:%M:%S").to_string(),
            "year" => now.format("%Y").to_string(),
            "rfc3339" => now.to_rfc3339(),
            other => {
                return Err(EngineError::DirectiveFailed {
                    name: self.name().to_string(),
                    reason: format!("unsupported format '{other}'"),
                })
            }
        };
        Ok(formatted)
    }
}

struct TextDirective;

impl Directive for TextDirective {
    fn name(&self) -> &str {
        "text"
    }

    fn resolve(&self, args: &str) -> Result<String, EngineError> {
        let (operation, value) = args.split_once(':').unwrap_or((args, ""));
        match operation {
            "upper" => Ok(value.to_uppercase()),
            "lower" => Ok(value.to_lowercase()),
            "trim" => Ok(value.trim().to_string()),
            other => Err(EngineError::DirectiveFailed {
                name: self.name().to_string(),
                reason: format!("unsupported operation '{other}'"),
            }),
        }
    }
}
