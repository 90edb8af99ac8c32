use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use replydesk_core::Ticket;
use replydesk_core::ticket::{FIELD_DESCRIPTION, FIELD_REQUESTER_EMAIL, FIELD_SUBJECT, TICKET_FIELDS};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The capability could not be loaded or initialized.
    #[error("host capability failed to load: {0}")]
    Load(String),
    /// The capability exists but a call on it failed.
    #[error("host capability call failed: {0}")]
    Usage(String),
}

/// Client handle exposed by the host once the capability is loaded.
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Read a set of named fields. Missing fields are simply absent from the map.
    async fn get(&self, fields: &[&str]) -> Result<Map<String, Value>, HostError>;
}

/// Entry point of the host integration SDK.
#[async_trait]
pub trait HostSdk: Send + Sync {
    /// A handle that is already reachable without any loading side effect.
    fn injected(&self) -> Option<Arc<dyn HostClient>> {
        None
    }

    /// Load and initialize the capability.
    async fn load(&self) -> Result<Arc<dyn HostClient>, HostError>;
}

/// Lazily obtains the host client. Never fails: anything that goes wrong
/// resolves to `None`. A handle, once obtained, is reused for every later call.
pub struct HostCapabilityLoader {
    sdk: Option<Arc<dyn HostSdk>>,
    handle: Mutex<Option<Arc<dyn HostClient>>>,
}

impl HostCapabilityLoader {
    pub fn new(sdk: Option<Arc<dyn HostSdk>>) -> Self {
        Self {
            sdk,
            handle: Mutex::new(None),
        }
    }

    /// Loader for an environment with no host capability at all.
    pub fn absent() -> Self {
        Self::new(None)
    }

    pub async fn acquire(&self) -> Option<Arc<dyn HostClient>> {
        if let Some(handle) = self.cached() {
            return Some(handle);
        }
        let sdk = self.sdk.as_ref()?;

        let handle = match sdk.injected() {
            Some(handle) => handle,
            None => match sdk.load().await {
                Ok(handle) => handle,
                Err(err) => {
                    tracing::debug!(error = %err, "host capability unavailable; using fallback sources");
                    return None;
                }
            },
        };

        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        // A concurrent acquire may have won; keep the first handle.
        Some(slot.get_or_insert(handle).clone())
    }

    fn cached(&self) -> Option<Arc<dyn HostClient>> {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Read the ticket fields through a host client.
pub async fn read_ticket(client: &dyn HostClient) -> Result<Ticket, HostError> {
    let fields = client.get(&TICKET_FIELDS).await?;
    Ok(Ticket {
        email: field_text(&fields, FIELD_REQUESTER_EMAIL),
        subject: field_text(&fields, FIELD_SUBJECT),
        description: field_text(&fields, FIELD_DESCRIPTION),
    })
}

fn field_text(fields: &Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Host SDK backed by a JSON object file mapping field names to values.
/// Loading only checks the file exists; every `get` re-reads it.
#[derive(Clone, Debug)]
pub struct FileHostSdk {
    path: PathBuf,
}

impl FileHostSdk {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HostSdk for FileHostSdk {
    async fn load(&self) -> Result<Arc<dyn HostClient>, HostError> {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| HostError::Load(format!("{}: {e}", self.path.display())))?;
        if !meta.is_file() {
            return Err(HostError::Load(format!(
                "{} is not a file",
                self.path.display()
            )));
        }
        Ok(Arc::new(FileHostClient {
            path: self.path.clone(),
        }))
    }
}

#[derive(Debug)]
struct FileHostClient {
    path: PathBuf,
}

#[async_trait]
impl HostClient for FileHostClient {
    async fn get(&self, fields: &[&str]) -> Result<Map<String, Value>, HostError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| HostError::Usage(format!("{}: {e}", self.path.display())))?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| HostError::Usage(format!("invalid JSON in {}: {e}", self.path.display())))?;
        let Value::Object(all) = value else {
            return Err(HostError::Usage(format!(
                "{} must contain a JSON object of ticket fields",
                self.path.display()
            )));
        };
        Ok(all
            .into_iter()
            .filter(|(name, _)| fields.contains(&name.as_str()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};

    use super::{FileHostSdk, HostCapabilityLoader, HostClient, HostError, HostSdk, read_ticket};

    struct StaticClient(Value);

    #[async_trait]
    impl HostClient for StaticClient {
        async fn get(&self, _fields: &[&str]) -> Result<Map<String, Value>, HostError> {
            match &self.0 {
                Value::Object(map) => Ok(map.clone()),
                _ => Err(HostError::Usage("not an object".into())),
            }
        }
    }

    #[derive(Default)]
    struct CountingSdk {
        loads: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl HostSdk for CountingSdk {
        async fn load(&self) -> Result<Arc<dyn HostClient>, HostError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HostError::Load("script blocked".into()));
            }
            Ok(Arc::new(StaticClient(json!({}))))
        }
    }

    struct InjectedSdk;

    #[async_trait]
    impl HostSdk for InjectedSdk {
        fn injected(&self) -> Option<Arc<dyn HostClient>> {
            Some(Arc::new(StaticClient(json!({}))))
        }

        async fn load(&self) -> Result<Arc<dyn HostClient>, HostError> {
            panic!("injected handle must be used without loading");
        }
    }

    #[tokio::test]
    async fn absent_host_resolves_unavailable() {
        let loader = HostCapabilityLoader::absent();
        assert!(loader.acquire().await.is_none());
    }

    #[tokio::test]
    async fn acquired_handle_is_reused_without_reloading() {
        let sdk = Arc::new(CountingSdk::default());
        let loader = HostCapabilityLoader::new(Some(sdk.clone() as Arc<dyn HostSdk>));
        let first = loader.acquire().await.unwrap();
        let second = loader.acquire().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sdk.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn injected_handle_skips_loading() {
        let loader = HostCapabilityLoader::new(Some(Arc::new(InjectedSdk) as Arc<dyn HostSdk>));
        assert!(loader.acquire().await.is_some());
    }

    #[tokio::test]
    async fn failed_load_resolves_unavailable_and_may_retry() {
        let sdk = Arc::new(CountingSdk {
            fail: true,
            ..Default::default()
        });
        let loader = HostCapabilityLoader::new(Some(sdk.clone() as Arc<dyn HostSdk>));
        assert!(loader.acquire().await.is_none());
        assert!(loader.acquire().await.is_none());
        assert_eq!(sdk.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn read_ticket_renders_missing_and_non_string_fields() {
        let client = StaticClient(json!({
            "ticket.requester.email": "Shanna@melissa.tv",
            "ticket.subject": null,
            "ticket.description": 42
        }));
        let ticket = read_ticket(&client).await.unwrap();
        assert_eq!(ticket.email, "Shanna@melissa.tv");
        assert_eq!(ticket.subject, "");
        assert_eq!(ticket.description, "42");
    }

    #[tokio::test]
    async fn file_host_loads_existing_file_and_filters_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticket.json");
        std::fs::write(
            &path,
            r#"{"ticket.requester.email": "Nathan@yesenia.net", "ticket.subject": "Login", "other": 1}"#,
        )
        .unwrap();

        let loader = HostCapabilityLoader::new(Some(Arc::new(FileHostSdk::new(&path)) as Arc<dyn HostSdk>));
        let client = loader.acquire().await.unwrap();
        let fields = client.get(&["ticket.requester.email", "ticket.subject"]).await.unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.get("other").is_none());
    }

    #[tokio::test]
    async fn file_host_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let sdk: Arc<dyn HostSdk> = Arc::new(FileHostSdk::new(dir.path().join("nope.json")));
        let loader = HostCapabilityLoader::new(Some(sdk));
        assert!(loader.acquire().await.is_none());
    }

    #[tokio::test]
    async fn file_host_corrupt_file_is_usage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticket.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let loader = HostCapabilityLoader::new(Some(Arc::new(FileHostSdk::new(&path)) as Arc<dyn HostSdk>));
        let client = loader.acquire().await.unwrap();
        let err = read_ticket(client.as_ref()).await.unwrap_err();
        assert!(matches!(err, HostError::Usage(_)));
        // still acquired for the next attempt
        assert!(loader.acquire().await.is_some());
    }
}
