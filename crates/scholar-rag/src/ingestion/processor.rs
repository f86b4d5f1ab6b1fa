//! Ingestion pipeline: chunk files one at a time and store them in batches

use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::Result;
use crate::providers::VectorStoreProvider;
use crate::types::{file_basename, Chunk, FileType};

use super::chunker::DocumentChunker;

/// Chunks produced for one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub chunks: usize,
}

/// Summary of an ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
}

impl IngestReport {
    /// Total chunks stored
    pub fn total_chunks(&self) -> usize {
        self.files.iter().map(|f| f.chunks).sum()
    }

    /// Files that produced no chunks
    pub fn empty_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.chunks == 0)
    }
}

/// Drives chunker -> vector store
pub struct IngestPipeline {
    chunker: Arc<DocumentChunker>,
    store: Arc<dyn VectorStoreProvider>,
    batch_size: usize,
}

impl IngestPipeline {
    /// Create a new ingest pipeline
    pub fn new(chunker: Arc<DocumentChunker>, store: Arc<dyn VectorStoreProvider>, batch_size: usize) -> Self {
        Self {
            chunker,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Chunk and store one file, returning the number of chunks stored
    ///
    /// Chunks stored by an earlier ingest of the same path are replaced. A file
    /// that yields no chunks leaves its earlier chunks in place.
    pub async fn ingest_file(&self, path: &Path, subject: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(path, subject).await;
        if let Some(first) = chunks.first() {
            let stale = self.store.delete_file(&first.metadata.file_path).await?;
            if stale > 0 {
                tracing::info!("Replacing {} chunks of {}", stale, first.metadata.source_file);
            }
        }
        self.add_chunks(&chunks).await?;
        Ok(chunks.len())
    }

    /// Ingest files in order; stops at the first store failure
    pub async fn ingest_files(&self, paths: &[PathBuf], subject: &str) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for path in paths {
            let chunks = self.ingest_file(path, subject).await?;
            report.files.push(FileReport {
                path: path.clone(),
                chunks,
            });
        }

        tracing::info!(
            "Ingested {} files ({} chunks, {} without text)",
            report.files.len(),
            report.total_chunks(),
            report.empty_files().count()
        );
        Ok(report)
    }

    /// Store chunks in batches of `batch_size`
    pub async fn add_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            tracing::debug!("No chunks to add");
            return Ok(());
        }

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            self.store.add(batch).await?;
            tracing::info!("Added batch {} ({} chunks) to {}", i + 1, batch.len(), self.store.name());
        }

        Ok(())
    }

    /// Remove everything from the store
    pub async fn clear_store(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Get the vector store
    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.store
    }
}

/// Expand files and directories into the supported files beneath them
///
/// Directories are walked recursively; results are sorted and deduplicated.
/// Explicitly named files are kept even when unsupported so the chunker can
/// report them.
pub fn discover_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        for entry in WalkDir::new(input).follow_links(true) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if FileType::from_path(entry.path()).is_supported() {
                        files.push(entry.into_path());
                    } else {
                        tracing::debug!("Skipping {}", file_basename(entry.path()));
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Cannot read {}: {}", input.display(), e),
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierConfig, RagConfig};
    use crate::ingestion::{DocumentClassifier, FileParser};
    use crate::providers::LocalVectorStore;
    use crate::retrieval::ChunkIndex;
    use crate::testing::{write_docx, HashEmbedder, RecordingStore};

    fn pipeline(store: Arc<dyn VectorStoreProvider>, batch_size: usize) -> IngestPipeline {
        let config = RagConfig::default();
        let classifier = Arc::new(DocumentClassifier::new(&ClassifierConfig::default(), None));
        let chunker = Arc::new(DocumentChunker::new(&config, Arc::new(FileParser), None, classifier));
        IngestPipeline::new(chunker, store, batch_size)
    }

    fn chunk(i: usize) -> Chunk {
        Chunk::new(
            format!("Chunk {} about relational algebra and query plans.", i),
            crate::types::ChunkMetadata {
                source_file: "dbms.pdf".to_string(),
                doc_type: crate::types::DocType::Notes,
                subject: "dbms".to_string(),
                page_number: 1,
                file_path: "dbms.pdf".to_string(),
            },
            i,
        )
    }

    #[tokio::test]
    async fn test_add_chunks_in_batches() {
        let store = Arc::new(RecordingStore::default());
        let chunks: Vec<Chunk> = (0..250).map(chunk).collect();

        pipeline(store.clone(), 100).add_chunks(&chunks).await.unwrap();
        assert_eq!(store.batch_sizes(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(RecordingStore::failing());
        let err = pipeline(store, 100).add_chunks(&[chunk(0)]).await.unwrap_err();
        assert!(err.is_store_failure());
    }

    #[tokio::test]
    async fn test_ingest_files_reports_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let docx = dir.path().join("os_notes.docx");
        write_docx(&docx, &["Lecture notes on process synchronization using semaphores and monitors."]);
        let unknown = dir.path().join("readme.md");
        std::fs::write(&unknown, "# readme").unwrap();

        let store = Arc::new(RecordingStore::default());
        let report = pipeline(store.clone(), 100)
            .ingest_files(&[docx.clone(), unknown.clone()], "os")
            .await
            .unwrap();

        assert_eq!(report.total_chunks(), 1);
        assert_eq!(report.files[0], FileReport { path: docx.clone(), chunks: 1 });
        assert_eq!(report.empty_files().next().map(|f| &f.path), Some(&unknown));
        assert_eq!(store.batch_sizes(), vec![1]);
        assert_eq!(store.deleted_files(), vec![docx.to_string_lossy().to_string()]);
    }

    #[tokio::test]
    async fn test_reingesting_edited_file_replaces_its_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("os_notes.docx");
        let other = dir.path().join("dbms_notes.docx");
        write_docx(&notes, &["Lecture notes on process synchronization using semaphores and monitors."]);
        write_docx(&other, &["Lecture notes on functional dependencies and normal forms in relations."]);

        let store: Arc<dyn VectorStoreProvider> = Arc::new(LocalVectorStore::new(
            Arc::new(ChunkIndex::in_memory("academic_docs").unwrap()),
            Arc::new(HashEmbedder::new()),
        ));
        let pipeline = pipeline(store.clone(), 100);

        pipeline.ingest_files(&[notes.clone(), other], "os").await.unwrap();
        pipeline.ingest_file(&notes, "os").await.unwrap();
        assert_eq!(store.len().await.unwrap(), 2);

        write_docx(&notes, &["Lecture notes on deadlock avoidance with the banker's algorithm and safe states."]);
        let stored = pipeline.ingest_file(&notes, "os").await.unwrap();
        assert_eq!(stored, 1);
        assert_eq!(store.len().await.unwrap(), 2);

        let results = store.similarity_search("semaphores monitors", 5, None).await.unwrap();
        assert!(results.iter().all(|c| !c.content.contains("semaphores")));
        assert!(results.iter().any(|c| c.content.contains("banker's algorithm")));
    }

    #[test]
    fn test_discover_files_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sem3").join("dbms");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("unit1.pdf"), b"").unwrap();
        std::fs::write(nested.join("scan.PNG"), b"").unwrap();
        std::fs::write(nested.join("notes.txt"), b"").unwrap();
        let explicit = dir.path().join("extra.xyz");

        let files = discover_files(&[dir.path().to_path_buf(), explicit.clone(), dir.path().to_path_buf()]);
        assert_eq!(files.len(), 3);
        assert!(files.contains(&nested.join("unit1.pdf")));
        assert!(files.contains(&nested.join("scan.PNG")));
        assert!(files.contains(&explicit));
    }
}
