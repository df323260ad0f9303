//! Vendor-agnostic LLM dispatch: one client contract, explicit vendor
//! registration and selection, and stream aggregation that normalizes
//! chunked vendor output into a single assistant message.

mod abort;
mod client;
mod dispatch;
mod error;
mod event_stream;
mod registry;
mod thinking;
mod types;
mod vendors;

pub use abort::{AbortController, AbortSignal};
pub use client::{
    ClosureVendorClient, VendorClient, VendorClientRef, VendorFuture, VendorListModelsFn,
    VendorSendFn, VendorStreamFn, VendorStreamReceiver,
};
pub use dispatch::{send, send_stream};
pub use error::{AiError, AiErrorCode};
pub use event_stream::{ChatEventStream, EventStream};
pub use registry::{Selection, VendorModels, VendorRegistry, DEFAULT_MODEL_LIST_TIMEOUT};
pub use thinking::{
    strip_thinking, strip_thinking_with, ThinkingFilter, DEFAULT_THINKING_CLOSE,
    DEFAULT_THINKING_OPEN,
};
pub use types::{
    ChatOptions, Message, Role, StreamChunk, StreamEvent, VendorCapabilities, VendorDescriptor,
    VendorStreamItem,
};
pub use vendors::OpenAiCompatVendor;
