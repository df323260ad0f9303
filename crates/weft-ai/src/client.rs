use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::AiError;
use crate::types::{ChatOptions, Message, VendorDescriptor, VendorStreamItem};

pub type VendorFuture<T> = Pin<Box<dyn Future<Output = Result<T, AiError>> + Send>>;

/// Channel on which a vendor task delivers chunks for one streamed call.
pub type VendorStreamReceiver = mpsc::UnboundedReceiver<VendorStreamItem>;

pub type VendorSendFn =
    Arc<dyn Fn(Vec<Message>, ChatOptions) -> VendorFuture<String> + Send + Sync>;
pub type VendorStreamFn =
    Arc<dyn Fn(Vec<Message>, ChatOptions) -> VendorFuture<VendorStreamReceiver> + Send + Sync>;
pub type VendorListModelsFn = Arc<dyn Fn() -> VendorFuture<Vec<String>> + Send + Sync>;

/// Uniform contract every backend hides behind. The engine passes the
/// assembled messages through unchanged; role tagging and order are the
/// vendor's wire input.
pub trait VendorClient: Send + Sync {
    fn descriptor(&self) -> VendorDescriptor;

    /// Readiness check; unconfigured vendors never appear as dispatch
    /// targets.
    fn is_configured(&self) -> bool;

    fn send(&self, messages: Vec<Message>, options: ChatOptions) -> VendorFuture<String>;

    fn send_stream(
        &self,
        messages: Vec<Message>,
        options: ChatOptions,
    ) -> VendorFuture<VendorStreamReceiver>;

    fn list_models(&self) -> VendorFuture<Vec<String>>;
}

pub type VendorClientRef = Arc<dyn VendorClient>;

/// Closure-backed client, used by tests and embedders that do not need a
/// full wire implementation.
#[derive(Clone)]
pub struct ClosureVendorClient {
    pub descriptor: VendorDescriptor,
    pub configured: bool,
    pub send: VendorSendFn,
    pub send_stream: VendorStreamFn,
    pub list_models: VendorListModelsFn,
}

impl VendorClient for ClosureVendorClient {
    fn descriptor(&self) -> VendorDescriptor {
        self.descriptor.clone()
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn send(&self, messages: Vec<Message>, options: ChatOptions) -> VendorFuture<String> {
        (self.send)(messages, options)
    }

    fn send_stream(
        &self,
        messages: Vec<Message>,
        options: ChatOptions,
    ) -> VendorFuture<VendorStreamReceiver> {
        (self.send_stream)(messages, options)
    }

    fn list_models(&self) -> VendorFuture<Vec<String>> {
        (self.list_models)()
    }
}

impl ClosureVendorClient {
    /// Client whose `send` and `list_models` report failure and whose
    /// stream never opens. Starting point for test doubles.
    pub fn unreachable(descriptor: VendorDescriptor) -> Self {
        Self {
            descriptor,
            configured: true,
            send: Arc::new(|_, _| {
                Box::pin(async {
                    Err(AiError::new(
                        crate::error::AiErrorCode::VendorFailure,
                        "no send handler installed",
                    ))
                })
            }),
            send_stream: Arc::new(|_, _| {
                Box::pin(async {
                    Err(AiError::new(
                        crate::error::AiErrorCode::VendorFailure,
                        "no stream handler installed",
                    ))
                })
            }),
            list_models: Arc::new(|| Box::pin(async { Ok(vec![]) })),
        }
    }
}
