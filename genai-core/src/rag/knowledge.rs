use include_dir::{include_dir, Dir, File};
use serde_json::json;
use tracing::info;

use crate::error::{GenAiError, GenAiResult};
use crate::rag::document::Document;
use crate::rag::splitter::TextSplitter;
use crate::rag::store::VectorStore;

/// Testcontainers Desktop notes bundled into the binary
pub static KNOWLEDGE: Dir = include_dir!("$CARGO_MANIFEST_DIR/knowledge");

fn collect_files<'a>(dir: &'a Dir<'a>, out: &mut Vec<&'a File<'a>>) {
    for file in dir.files() {
        out.push(file);
    }

    for sub in dir.dirs() {
        collect_files(sub, out);
    }
}

/// Load every `.txt` file of `dir` as chunked documents with a `source` metadata entry.
/// Any other file is an error.
pub fn load_documents(dir: &Dir<'_>, splitter: &TextSplitter) -> GenAiResult<Vec<Document>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files);

    let mut documents = Vec::new();
    for file in files {
        let path = file.path().display().to_string();
        info!(target: "genai::rag", "Ingesting document: {}", path);

        if file.path().extension().and_then(|e| e.to_str()) != Some("txt") {
            return Err(GenAiError::Ingestion(format!("unsupported file type: {}", path)));
        }
        let text = file
            .contents_utf8()
            .ok_or_else(|| GenAiError::Ingestion(format!("{} is not valid utf-8", path)))?;

        let source = Document::new(text).with_metadata("source", json!(path));
        documents.extend(splitter.split_documents(&[source]));
    }

    Ok(documents)
}

/// Split the bundled knowledge and add it to `store`, returns the number of chunks stored
pub async fn ingest(store: &dyn VectorStore, dir: &Dir<'_>, splitter: &TextSplitter) -> GenAiResult<usize> {
    let documents = load_documents(dir, splitter)?;
    store.add_documents(&documents).await?;
    info!(target: "genai::rag", "Ingested {} documents", documents.len());
    Ok(documents.len())
}
