use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::error::{FulfillmentError, FulfillmentResult};

/// Document supplied with a submission, e.g. a signed prescription scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub content_base64: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store `document` against a prescription and return its reference
    async fn attach(&self, prescription_id: Uuid, document: &DocumentUpload) -> FulfillmentResult<String>;
}

/// Writes documents to `<root>/<prescription_id>/<file_name>`
#[derive(Debug, Clone)]
pub struct FileSystemDocumentStore {
    root: PathBuf,
}

impl FileSystemDocumentStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

/// Last path component of an uploaded name; anything that could escape the
/// prescription directory is refused
fn safe_file_name(name: &str) -> FulfillmentResult<String> {
    let candidate = name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return Err(FulfillmentError::Attachment(format!(
            "unusable document file name '{name}'"
        )));
    }
    Ok(candidate.to_string())
}

#[async_trait]
impl DocumentStore for FileSystemDocumentStore {
    async fn attach(&self, prescription_id: Uuid, document: &DocumentUpload) -> FulfillmentResult<String> {
        let file_name = safe_file_name(&document.file_name)?;
        let bytes = STANDARD
            .decode(document.content_base64.trim())
            .map_err(|e| FulfillmentError::Attachment(format!("document is not valid base64: {e}")))?;

        let dir = self.root.join(prescription_id.to_string());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| FulfillmentError::Attachment(format!("failed to create {}: {e}", dir.display())))?;

        let path = dir.join(&file_name);
        fs::write(&path, &bytes)
            .await
            .map_err(|e| FulfillmentError::Attachment(format!("failed to write {}: {e}", path.display())))?;

        info!(%prescription_id, file_name = %file_name, bytes = bytes.len(), "Document attached");
        Ok(format!("{prescription_id}/{file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn upload(name: &str, content: &str) -> DocumentUpload {
        DocumentUpload {
            file_name: name.to_string(),
            content_type: Some("application/pdf".to_string()),
            content_base64: content.to_string(),
        }
    }

    #[tokio::test]
    async fn document_lands_under_prescription_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileSystemDocumentStore::new(dir.path());
        let id = Uuid::new_v4();

        let reference = store
            .attach(id, &upload("rx.pdf", &STANDARD.encode(b"%PDF-1.4")))
            .await
            .unwrap();

        assert_eq!(reference, format!("{id}/rx.pdf"));
        let written = std::fs::read(dir.path().join(id.to_string()).join("rx.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn path_components_are_stripped() {
        let dir = TempDir::new().unwrap();
        let store = FileSystemDocumentStore::new(dir.path());
        let id = Uuid::new_v4();

        let reference = store
            .attach(id, &upload("../../etc/passwd", &STANDARD.encode(b"x")))
            .await
            .unwrap();
        assert_eq!(reference, format!("{id}/passwd"));
        assert!(store.attach(id, &upload("..", "eA==")).await.is_err());
    }

    #[tokio::test]
    async fn invalid_base64_is_an_attachment_error() {
        let dir = TempDir::new().unwrap();
        let store = FileSystemDocumentStore::new(dir.path());
        let err = store
            .attach(Uuid::new_v4(), &upload("rx.pdf", "***not base64***"))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Attachment(_)));
    }
}
