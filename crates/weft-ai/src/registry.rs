use std::sync::RwLock;
use std::time::Duration;

use tracing::warn;

use crate::client::VendorClientRef;
use crate::error::{AiError, AiErrorCode};
use crate::types::VendorDescriptor;

pub const DEFAULT_MODEL_LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of vendor selection: the client to dispatch to and the model
/// identifier the call should request, when one could be determined.
#[derive(Clone)]
pub struct Selection {
    pub client: VendorClientRef,
    pub vendor: String,
    pub model: Option<String>,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("vendor", &self.vendor)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Models one vendor reported during discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorModels {
    pub vendor: String,
    pub models: Vec<String>,
}

/// Explicitly constructed set of vendor clients. Registration happens at
/// startup; request-serving reads work against a snapshot taken under
/// the lock, so a concurrent reconfiguration never tears a selection.
pub struct VendorRegistry {
    entries: RwLock<Vec<VendorClientRef>>,
    default: RwLock<Option<(String, String)>>,
    model_list_timeout: Duration,
}

impl VendorRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            default: RwLock::new(None),
            model_list_timeout: DEFAULT_MODEL_LIST_TIMEOUT,
        }
    }

    pub fn with_model_list_timeout(mut self, timeout: Duration) -> Self {
        self.model_list_timeout = timeout;
        self
    }

    /// Registration order is selection tie-break order.
    pub fn register(&self, client: VendorClientRef) {
        self.entries
            .write()
            .expect("vendor registry lock poisoned")
            .push(client);
    }

    pub fn set_default(&self, vendor: impl Into<String>, model: impl Into<String>) {
        *self.default.write().expect("vendor registry lock poisoned") =
            Some((vendor.into(), model.into()));
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .expect("vendor registry lock poisoned")
            .clear();
        *self.default.write().expect("vendor registry lock poisoned") = None;
    }

    /// Descriptors of configured vendors, registration order.
    pub fn configured_descriptors(&self) -> Vec<VendorDescriptor> {
        self.configured_snapshot()
            .iter()
            .map(|client| client.descriptor())
            .collect()
    }

    fn configured_snapshot(&self) -> Vec<VendorClientRef> {
        self.entries
            .read()
            .expect("vendor registry lock poisoned")
            .iter()
            .filter(|client| client.is_configured())
            .cloned()
            .collect()
    }

    fn default_pair(&self) -> Option<(String, String)> {
        self.default
            .read()
            .expect("vendor registry lock poisoned")
            .clone()
    }

    /// Resolves exactly one dispatch target. Misconfiguration surfaces
    /// immediately; nothing here retries.
    pub async fn select(
        &self,
        model_hint: Option<&str>,
        vendor_hint: Option<&str>,
    ) -> Result<Selection, AiError> {
        let configured = self.configured_snapshot();

        // An explicit vendor hint is answered about that vendor even
        // when nothing else is configured.
        let candidates: Vec<VendorClientRef> = match vendor_hint {
            Some(vendor) => {
                let found = configured
                    .iter()
                    .find(|client| client.descriptor().name == vendor)
                    .cloned();
                match found {
                    Some(client) => vec![client],
                    None => {
                        return Err(AiError::new(
                            AiErrorCode::VendorNotConfigured,
                            format!("vendor '{vendor}' is not configured"),
                        ));
                    }
                }
            }
            None => {
                if configured.is_empty() {
                    return Err(AiError::new(
                        AiErrorCode::NoVendorsConfigured,
                        "no configured vendors in registry",
                    ));
                }
                configured.clone()
            }
        };

        if let Some(model) = model_hint {
            // Static descriptor sets first, then live discovery for
            // vendors that only know their models at runtime.
            if let Some(client) = candidates
                .iter()
                .find(|client| client.descriptor().serves_model(model))
            {
                return Ok(Selection {
                    vendor: client.descriptor().name,
                    client: client.clone(),
                    model: Some(model.to_string()),
                });
            }

            let dynamic: Vec<VendorClientRef> = candidates
                .iter()
                .filter(|client| client.descriptor().models.is_empty())
                .cloned()
                .collect();
            for (client, discovered) in discover_for(&dynamic, self.model_list_timeout).await {
                if discovered.iter().any(|candidate| candidate == model) {
                    return Ok(Selection {
                        vendor: client.descriptor().name,
                        client,
                        model: Some(model.to_string()),
                    });
                }
            }

            return Err(AiError::new(
                AiErrorCode::ModelNotAvailable,
                format!("no configured vendor serves model '{model}'"),
            ));
        }

        if let Some(vendor) = vendor_hint {
            let client = candidates[0].clone();
            let model = match self.default_pair() {
                Some((default_vendor, default_model)) if default_vendor == vendor => {
                    Some(default_model)
                }
                _ => client.descriptor().models.first().cloned(),
            };
            return Ok(Selection {
                vendor: vendor.to_string(),
                client,
                model,
            });
        }

        if let Some((default_vendor, default_model)) = self.default_pair() {
            let found = configured
                .iter()
                .find(|client| client.descriptor().name == default_vendor)
                .cloned();
            return match found {
                Some(client) => Ok(Selection {
                    vendor: default_vendor,
                    client,
                    model: Some(default_model),
                }),
                None => Err(AiError::new(
                    AiErrorCode::VendorNotConfigured,
                    format!("default vendor '{default_vendor}' is not configured"),
                )),
            };
        }

        // No hints and no configured default: first registered wins.
        let client = configured[0].clone();
        let descriptor = client.descriptor();
        Ok(Selection {
            vendor: descriptor.name.clone(),
            model: descriptor.models.first().cloned(),
            client,
        })
    }

    /// Queries every configured vendor concurrently. A vendor that fails
    /// or exceeds the timeout contributes zero models; one slow vendor
    /// never blocks the others past the deadline.
    pub async fn discover_models(&self) -> Vec<VendorModels> {
        let configured = self.configured_snapshot();
        discover_for(&configured, self.model_list_timeout)
            .await
            .into_iter()
            .map(|(client, models)| VendorModels {
                vendor: client.descriptor().name,
                models,
            })
            .collect()
    }
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn discover_for(
    clients: &[VendorClientRef],
    timeout: Duration,
) -> Vec<(VendorClientRef, Vec<String>)> {
    let handles: Vec<_> = clients
        .iter()
        .map(|client| {
            let listing = client.list_models();
            let name = client.descriptor().name;
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, listing).await {
                    Ok(Ok(models)) => models,
                    Ok(Err(error)) => {
                        warn!(vendor = %name, %error, "model listing failed");
                        vec![]
                    }
                    Err(_) => {
                        warn!(vendor = %name, "model listing timed out");
                        vec![]
                    }
                }
            })
        })
        .collect();

    let mut results = Vec::with_capacity(clients.len());
    for (client, handle) in clients.iter().zip(handles) {
        let models = handle.await.unwrap_or_default();
        results.push((client.clone(), models));
    }
    results
}
