//! scholar-rag command-line interface
//!
//! Usage:
//!   scholar-rag ingest notes/ papers/2023_os.pdf --subject os
//!   scholar-rag query "explain demand paging" --doc-type pyq --scores
//!   scholar-rag classify syllabus.docx
//!   scholar-rag check

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scholar_rag::ingestion::{discover_files, ClassificationMethod, TesseractOcr};
use scholar_rag::{AppContext, DocType, RagConfig, Retriever};

/// Ingest academic documents and retrieve context for questions.
#[derive(Parser)]
#[command(name = "scholar-rag", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, short, global = true, env = "SCHOLAR_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk files (or every supported file under directories) and store them.
    Ingest {
        /// Files or directories to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Subject tag attached to every chunk.
        #[arg(long, default_value = "general")]
        subject: String,

        /// Wipe the store before ingesting.
        #[arg(long)]
        clear: bool,
    },

    /// Retrieve the chunks most relevant to a query.
    Query {
        text: String,

        /// Number of chunks to return.
        #[arg(long, short = 'k')]
        top_k: Option<usize>,

        /// Only chunks of this type (pyq, syllabus, lab_manual, textbook, notes).
        #[arg(long)]
        doc_type: Option<DocType>,

        /// Only chunks with this subject tag.
        #[arg(long)]
        subject: Option<String>,

        /// Show relevance scores.
        #[arg(long)]
        scores: bool,

        /// Print the formatted prompt context instead of previews.
        #[arg(long, conflicts_with = "scores")]
        context: bool,
    },

    /// Classify a document without storing it.
    Classify {
        file: PathBuf,

        /// Use this text as the preview instead of extracting the file.
        #[arg(long)]
        preview: Option<String>,
    },

    /// Delete every stored chunk.
    Clear,

    /// Check that the language model, embedder, store and OCR tools respond.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scholar_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    tracing::debug!(
        "Chunking {} / {} chars, store {}",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
        config.vector_db.storage_path.display()
    );

    match cli.command {
        Command::Ingest { paths, subject, clear } => {
            let ctx = AppContext::from_config(config)?;
            if clear {
                ctx.pipeline().clear_store().await?;
            }

            let files = discover_files(&paths);
            if files.is_empty() {
                anyhow::bail!("no supported files found");
            }

            let report = ctx.pipeline().ingest_files(&files, &subject).await?;
            for file in &report.files {
                println!("{:>5}  {}", file.chunks, file.path.display());
            }
            println!("{:>5}  total chunks from {} files", report.total_chunks(), report.files.len());
        }

        Command::Query {
            text,
            top_k,
            doc_type,
            subject,
            scores,
            context,
        } => {
            let top_k = top_k.unwrap_or(config.retrieval.default_top_k);
            let ctx = AppContext::from_config(config)?;
            let results = ctx
                .retriever()
                .retrieve_with_scores(&text, top_k, doc_type, subject.as_deref())
                .await?;

            if results.is_empty() {
                println!("No matching chunks.");
                return Ok(());
            }

            if context {
                let chunks: Vec<_> = results.into_iter().map(|r| r.chunk).collect();
                println!("{}", Retriever::format_chunks_for_prompt(&chunks));
                return Ok(());
            }

            for (i, result) in results.iter().enumerate() {
                let preview: String = result.chunk.content.chars().take(200).collect();
                if scores {
                    println!("{}. [{:.3}] {}", i + 1, result.score, result.chunk.format_citation());
                } else {
                    println!("{}. {}", i + 1, result.chunk.format_citation());
                }
                println!("   {}\n", preview.replace('\n', " "));
            }
        }

        Command::Classify { file, preview } => {
            let ctx = AppContext::from_config(config)?;
            let classification = match preview {
                Some(preview) => {
                    ctx.classifier()
                        .classify_detailed(&file.to_string_lossy(), &preview)
                        .await
                }
                None => ctx.chunker().classify_file(&file).await,
            };
            let method = match classification.method {
                ClassificationMethod::RuleBased { score } => format!("keywords, score {}", score),
                ClassificationMethod::Model => format!("model {}", ctx.llm().model()),
                ClassificationMethod::Fallback => "default".to_string(),
            };
            println!("{} ({})", classification.doc_type, method);
        }

        Command::Clear => {
            let ctx = AppContext::from_config(config)?;
            ctx.store().clear().await?;
            println!("Vector store cleared.");
        }

        Command::Check => {
            let ocr_status = if config.ocr.enabled {
                match TesseractOcr::new(&config.ocr) {
                    Ok(_) => "ok".to_string(),
                    Err(e) => format!("FAILED: {}", e),
                }
            } else {
                "disabled".to_string()
            };

            // OCR is reported separately so a missing binary does not hide the rest
            let mut check_config = config;
            check_config.ocr.enabled = false;
            let ctx = AppContext::from_config(check_config)?;

            let mut healthy = !ocr_status.starts_with("FAILED");
            for status in ctx.health_check().await {
                healthy &= status.healthy;
                println!(
                    "{:<11} {:<32} {}",
                    status.component,
                    status.provider,
                    if status.healthy { "ok" } else { "UNREACHABLE" }
                );
            }
            println!("{:<11} {:<32} {}", "ocr", "tesseract + pdftoppm", ocr_status);

            if !healthy {
                anyhow::bail!("one or more components are unavailable");
            }
        }
    }

    Ok(())
}
