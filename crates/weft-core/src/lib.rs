//! Prompt orchestration engine: named system-prompt patterns with
//! template substitution and directive expansion, session-aware message
//! assembly, and turn execution over the vendor layer in `weft-ai`.

mod assembler;
mod directive;
mod error;
mod orchestrator;
mod pattern;
mod request;
mod session;
mod store;
mod template;

pub use assembler::build_session;
pub use directive::{ClockFn, Directive, DirectiveRegistry};
pub use error::EngineError;
pub use orchestrator::{ChatTurn, Orchestrator, StreamingTurn};
pub use pattern::{Pattern, PatternResolver, PatternStore, PatternStoreRef};
pub use request::ChatRequest;
pub use session::{Session, SessionStore, SessionStoreRef};
pub use store::{DirPatternStore, FileSessionStore};
pub use template::{render, TemplateContext, INPUT_VARIABLE};
