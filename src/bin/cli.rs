//! Command-line entry point: ingest certification PDFs, then ask questions.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use greenrag::config::PipelineConfig;
use greenrag::document::PdfSource;
use greenrag::providers::openai::OpenAiClient;
use greenrag::{IngestionPipeline, QueryService, VectorStore};

#[derive(Parser)]
#[command(
    name = "greenrag",
    version,
    about = "Retrieval-augmented QA over green-building certification PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed, classify, and store a PDF document.
    Ingest {
        /// Path to the PDF to ingest.
        pdf: PathBuf,
    },
    /// Answer a question from the stored chunks.
    Ask {
        question: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = PipelineConfig::from_env();
    let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| "OPENAI_API_KEY is not set")?;

    let client = Arc::new(
        OpenAiClient::new(api_key, config.dimension)
            .with_base_url(config.api_base.clone())
            .with_models(config.embed_model.clone(), config.chat_model.clone()),
    );
    let store = Arc::new(VectorStore::open(&config.storage_dir, config.dimension)?);

    match cli.command {
        Command::Ingest { pdf } => {
            let pipeline = IngestionPipeline::new(store, client.clone(), client)
                .with_chunk_size(config.chunk_size);
            let report = pipeline.ingest_document(&PdfSource::new(), &pdf).await?;
            println!(
                "ingested {} chunks from {} pages of {}",
                report.chunks,
                report.pages,
                pdf.display()
            );
        }
        Command::Ask { question } => {
            let service = QueryService::new(store, client.clone(), client);
            let outcome = service.answer(&question).await?;
            println!(
                "[{} | page {} | distance {:.4}]",
                outcome.entry.credit_type, outcome.entry.page_number, outcome.distance
            );
            println!("{}", outcome.answer);
        }
    }
    Ok(())
}
