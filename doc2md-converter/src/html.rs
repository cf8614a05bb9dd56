use std::path::Path;

use async_trait::async_trait;

use crate::{ConvertError, Converter};

/// In-process HTML to Markdown conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlConverter;

#[async_trait]
impl Converter for HtmlConverter {
    fn name(&self) -> &str {
        "html2md"
    }

    async fn convert_file(&self, path: &Path) -> Result<String, ConvertError> {
        let bytes = tokio::fs::read(path).await?;
        let html = String::from_utf8_lossy(&bytes).into_owned();
        tokio::task::spawn_blocking(move || html2md::rewrite_html(&html, false))
            .await
            .map_err(|e| ConvertError::Join(e.to_string()))
    }
}
