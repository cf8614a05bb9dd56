use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{ConvertError, Converter};

/// Dispatches on the input file's extension, falling back to a default converter.
#[derive(Clone)]
pub struct ExtensionRouter {
    fallback: Arc<dyn Converter>,
    routes: HashMap<String, Arc<dyn Converter>>,
}

impl ExtensionRouter {
    pub fn new(fallback: Arc<dyn Converter>) -> Self {
        Self {
            fallback,
            routes: HashMap::new(),
        }
    }

    /// Send files ending in `extension` (case-insensitive, dot optional) to `converter`.
    #[must_use]
    pub fn route(mut self, extension: &str, converter: Arc<dyn Converter>) -> Self {
        let key = extension.trim_start_matches('.').to_ascii_lowercase();
        self.routes.insert(key, converter);
        self
    }

    fn pick(&self, path: &Path) -> &Arc<dyn Converter> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.routes.get(&e.to_ascii_lowercase()))
            .unwrap_or(&self.fallback)
    }
}

impl std::fmt::Debug for ExtensionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRouter")
            .field("fallback", &self.fallback.name())
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl Converter for ExtensionRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn convert_file(&self, path: &Path) -> Result<String, ConvertError> {
        let converter = self.pick(path);
        tracing::trace!(converter = converter.name(), path = %path.display(), "routing conversion");
        converter.convert_file(path).await
    }
}
