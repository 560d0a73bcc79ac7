//! Document loaders.
//!
//! A [`DocumentLoader`] turns a source path into [`Document`]s, one per
//! logical unit. [`PdfLoader`] (feature `pdf`) yields one document per page
//! with a 1-based `page` number in its metadata.

use std::path::Path;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

/// A source of documents.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load every document from `path`.
    async fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

#[cfg(feature = "pdf")]
pub use pdf::PdfLoader;

#[cfg(feature = "pdf")]
mod pdf {
    use std::path::Path;

    use async_trait::async_trait;
    use serde_json::Value;
    use tracing::{error, info};

    use super::DocumentLoader;
    use crate::document::{Document, assign_page_numbers};
    use crate::error::{RagError, Result};

    /// Loads a PDF file as one [`Document`] per page using `pdf-extract`.
    ///
    /// Document IDs are `{file_stem}_page_{n}`. Metadata holds `source`,
    /// `file_path`, `total_pages`, and `page`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PdfLoader;

    impl PdfLoader {
        /// Create a new PDF loader.
        pub fn new() -> Self {
            Self
        }

        /// Build page documents from already extracted page texts.
        pub fn documents_from_pages(path: &Path, pages: Vec<String>) -> Vec<Document> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
            let source = path.display().to_string();
            let file_path = std::fs::canonicalize(path)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| source.clone());
            let total_pages = pages.len();

            let mut documents: Vec<Document> = pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    Document::new(format!("{stem}_page_{}", i + 1), text)
                        .with_metadata("source", source.clone())
                        .with_metadata("file_path", file_path.clone())
                        .with_metadata("total_pages", Value::from(total_pages))
                })
                .collect();
            for document in &mut documents {
                document.source_uri = Some(source.clone());
            }

            assign_page_numbers(&mut documents);
            documents
        }
    }

    fn loader_error(path: &Path, message: impl Into<String>) -> RagError {
        RagError::LoaderError { path: path.display().to_string(), message: message.into() }
    }

    #[async_trait]
    impl DocumentLoader for PdfLoader {
        async fn load(&self, path: &Path) -> Result<Vec<Document>> {
            if !path.exists() {
                error!(path = %path.display(), "pdf not found");
                return Err(loader_error(path, "file not found"));
            }

            let bytes = tokio::fs::read(path).await.map_err(|e| {
                error!(path = %path.display(), error = %e, "failed to read pdf");
                loader_error(path, format!("failed to read file: {e}"))
            })?;

            let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
                error!(path = %path.display(), error = %e, "failed to parse pdf");
                loader_error(path, format!("not a readable PDF: {e}"))
            })?;

            let documents = Self::documents_from_pages(path, pages);
            info!(path = %path.display(), page_count = documents.len(), "loaded pdf");
            Ok(documents)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn missing_file_is_a_loader_error() {
            let err = PdfLoader::new()
                .load(Path::new("definitely/not/here.pdf"))
                .await
                .unwrap_err();
            assert!(matches!(err, RagError::LoaderError { .. }));
            assert!(err.to_string().contains("file not found"));
        }

        #[tokio::test]
        async fn non_pdf_bytes_are_a_loader_error() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("notes.pdf");
            std::fs::write(&path, b"just some plain text").unwrap();

            let err = PdfLoader::new().load(&path).await.unwrap_err();
            assert!(matches!(err, RagError::LoaderError { .. }));
        }

        #[test]
        fn page_documents_are_numbered_from_one() {
            let pages = vec!["first".to_string(), String::new(), "third".to_string()];
            let docs = PdfLoader::documents_from_pages(Path::new("report.pdf"), pages);

            assert_eq!(docs.len(), 3);
            for (i, doc) in docs.iter().enumerate() {
                assert_eq!(doc.page(), Some(i as u32 + 1));
                assert_eq!(doc.metadata.get("total_pages"), Some(&Value::from(3)));
            }
            assert_eq!(docs[0].id, "report_page_1");
            assert_eq!(docs[1].text, "");
        }
    }
}
