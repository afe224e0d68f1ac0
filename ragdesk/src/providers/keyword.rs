//! Keyword retrieval using Tantivy (BM25)
//!
//! Serves either evidence category from an in-memory index, so the pipeline
//! can run without an external vector store.

use std::path::Path;

use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::retrieval::{ProviderKind, RetrievalProvider, RetrievedItem};

/// Index plus field handles; clones share the underlying segments
#[derive(Clone)]
struct SearchIndex {
    index: Index,
    reader: IndexReader,
    limit: usize,
    // Field handles
    body_field: Field,
    content_field: Field,
    metadata_field: Field,
}

impl SearchIndex {
    fn search(&self, query: &str) -> Result<Vec<RetrievedItem>, ProviderError> {
        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.body_field]);

        // Customer questions are free text; syntax errors are ignored
        let (parsed_query, _errors) = query_parser.parse_query_lenient(query);

        let top_docs = searcher.search(&parsed_query, &TopDocs::with_limit(self.limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved_doc: TantivyDocument = searcher.doc(doc_address)?;

            let content = get_text_field(&retrieved_doc, self.content_field);
            let metadata_json = get_text_field(&retrieved_doc, self.metadata_field);

            let mut item = RetrievedItem {
                content,
                metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            };
            item.metadata.insert("score".to_string(), format!("{:.4}", score));
            results.push(item);
        }

        Ok(results)
    }
}

/// BM25 search over a fixed set of items
pub struct KeywordProvider {
    kind: ProviderKind,
    index: SearchIndex,
    count: usize,
}

impl KeywordProvider {
    /// Index `items` in RAM
    pub fn from_items(
        kind: ProviderKind,
        items: &[RetrievedItem],
        limit: usize,
    ) -> Result<Self, ProviderError> {
        let mut schema_builder = Schema::builder();

        // Searchable text: content plus FAQ question/answer metadata
        let body_field = schema_builder.add_text_field("body", TEXT);
        let content_field = schema_builder.add_text_field("content", STORED);
        let metadata_field = schema_builder.add_text_field("metadata", STORED);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        let mut writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000)?;

        for item in items {
            let body = [
                item.content.as_str(),
                item.get("question").unwrap_or(""),
                item.get("answer").unwrap_or(""),
            ]
            .join("\n");

            writer.add_document(doc!(
                body_field => body,
                content_field => item.content.as_str(),
                metadata_field => serde_json::to_string(&item.metadata)?
            ))?;
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        reader.reload()?;

        info!("Indexed {} {} items for keyword retrieval", items.len(), kind);

        Ok(Self {
            kind,
            index: SearchIndex {
                index,
                reader,
                limit: limit.max(1),
                body_field,
                content_field,
                metadata_field,
            },
            count: items.len(),
        })
    }

    /// Load items from a JSON-lines file with one `{content, metadata}`
    /// object per line. Blank lines are skipped.
    pub fn from_jsonl(
        kind: ProviderKind,
        path: impl AsRef<Path>,
        limit: usize,
    ) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProviderError::NotConfigured(format!(
                "knowledge file {:?} not found",
                path
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        let items = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<RetrievedItem>)
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_items(kind, &items, limit)
    }

    /// Search the index for `query` on the calling thread
    pub fn search(&self, query: &str) -> Result<Vec<RetrievedItem>, ProviderError> {
        let results = self.index.search(query)?;
        debug!("Keyword search returned {} {} items", results.len(), self.kind);
        Ok(results)
    }

    /// Number of indexed items
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[async_trait]
impl RetrievalProvider for KeywordProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Searching is CPU-bound, so it runs on the blocking pool and the
    /// caller's timeout stays enforceable.
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedItem>, ProviderError> {
        let index = self.index.clone();
        let query = query.to_string();
        let results = tokio::task::spawn_blocking(move || index.search(&query))
            .await
            .map_err(|e| ProviderError::Backend(format!("keyword search did not complete: {}", e)))??;

        debug!("Keyword search returned {} {} items", results.len(), self.kind);
        Ok(results)
    }
}

/// Helper to extract text field value
fn get_text_field(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn faq_items() -> Vec<RetrievedItem> {
        vec![
            RetrievedItem::new("")
                .with_metadata("question", "What are the fees for Pix transfers?")
                .with_metadata("answer", "Pix transfers are free for individuals.")
                .with_metadata("url", "https://example.com/pix"),
            RetrievedItem::new("")
                .with_metadata("question", "How do I order a card machine?")
                .with_metadata("answer", "Order it from the app under Devices.")
                .with_metadata("url", "https://example.com/maquininha"),
        ]
    }

    #[test]
    fn test_index_and_search() {
        let provider = KeywordProvider::from_items(ProviderKind::Faq, &faq_items(), 2).unwrap();
        assert_eq!(provider.len(), 2);

        let results = provider.search("pix fees").unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].url(), Some("https://example.com/pix"));
        assert!(results[0].metadata.contains_key("score"));
    }

    #[test]
    fn test_query_syntax_is_lenient() {
        let provider = KeywordProvider::from_items(ProviderKind::Faq, &faq_items(), 2).unwrap();
        assert!(provider.search("card machine?? (order").is_ok());
    }

    #[test]
    fn test_from_jsonl() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"content": "Boleto payments settle in one business day.", "metadata": {{"url": "https://example.com/boleto"}}}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"content": "The digital account has no monthly fee."}}"#).unwrap();

        let provider =
            KeywordProvider::from_jsonl(ProviderKind::SemanticVector, file.path(), 3).unwrap();
        assert_eq!(provider.len(), 2);

        let results = provider.search("boleto settle").unwrap();
        assert_eq!(results[0].url(), Some("https://example.com/boleto"));
    }

    #[test]
    fn test_missing_file_is_not_configured() {
        let err = KeywordProvider::from_jsonl(ProviderKind::Faq, "/nonexistent/faq.jsonl", 2).err();
        assert!(matches!(err, Some(ProviderError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_retrieve_via_trait() {
        let provider = KeywordProvider::from_items(ProviderKind::Faq, &faq_items(), 1).unwrap();
        let items = provider.retrieve("card machine").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get("url"), Some("https://example.com/maquininha"));
    }
}
