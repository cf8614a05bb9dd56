//! Document to Markdown conversion.
//!
//! A [`Converter`] reads a document from disk and returns Markdown. Workers
//! receive raw bytes, so [`convert_bytes`] materializes them as a temporary
//! file carrying the original extension and removes it afterwards.

pub mod command;
pub mod error;
pub mod html;
pub mod router;

use std::path::Path;

use async_trait::async_trait;

pub use command::CommandConverter;
pub use error::ConvertError;
pub use html::HtmlConverter;
pub use router::ExtensionRouter;

#[async_trait]
pub trait Converter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn convert_file(&self, path: &Path) -> Result<String, ConvertError>;
}

/// Convert in-memory document bytes.
///
/// `extension` is the file extension without the dot. The temporary file is
/// deleted when this returns, whether or not conversion succeeded.
pub async fn convert_bytes(
    converter: &dyn Converter,
    bytes: &[u8],
    extension: &str,
) -> Result<String, ConvertError> {
    let suffix = temp_suffix(extension);
    let file = tempfile::Builder::new()
        .prefix("doc2md-")
        .suffix(&suffix)
        .tempfile()?;
    tokio::fs::write(file.path(), bytes).await?;

    tracing::debug!(
        converter = converter.name(),
        path = %file.path().display(),
        size = bytes.len(),
        "converting document"
    );
    let result = converter.convert_file(file.path()).await;
    drop(file);
    result
}

fn temp_suffix(extension: &str) -> String {
    let clean: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if clean.is_empty() {
        String::new()
    } else {
        format!(".{}", clean.to_ascii_lowercase())
    }
}
