//! Natural-language querying over the indexed system information.
//!
//! [`QueryEngine`] owns one loaded index and one Ollama model binding for
//! the lifetime of the process. Each question is embedded, matched against
//! the index by cosine similarity, and the top chunks are handed to the
//! model as grounding context for answer synthesis.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::Config;
use crate::index::{IndexError, IndexManager, OllamaEmbedder, ScoredChunk};
use crate::ollama::OllamaClient;

/// Number of context chunks handed to the model per question.
const TOP_K: usize = 4;

pub struct QueryEngine {
    manager: IndexManager,
    client: OllamaClient,
    model: String,
}

impl QueryEngine {
    /// Initialize the engine: load or build the index, bind the model.
    ///
    /// The artifact directory must already exist — querying before the first
    /// collection run is an environment error, not a build trigger.
    pub async fn initialize(config: &Config, system_info_dir: &Path, model: &str) -> Result<Self> {
        if !system_info_dir.is_dir() {
            bail!(
                "System info directory '{}' not found. Run 'shellai collect' first.",
                system_info_dir.display()
            );
        }

        println!("Initializing with model: {}", model);

        let client = OllamaClient::new(&config.ollama.base_url, config.ollama.request_timeout)?;
        let embedder = OllamaEmbedder::new(client.clone(), &config.embedding.model);
        let storage_dir = system_info_dir.join(&config.system_info.storage_dir);
        let mut manager = IndexManager::new(system_info_dir, &storage_dir, Box::new(embedder));

        manager.initialize().await?;

        Ok(Self {
            manager,
            client,
            model: model.to_string(),
        })
    }

    /// Answer one question against the loaded index.
    pub async fn query(&self, question: &str) -> Result<String> {
        let index = self
            .manager
            .index()
            .context("Query engine not initialized")?;

        let query_vec = self
            .manager
            .embedder()
            .embed(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .context("Empty embedding response")?;

        let hits = index.top_k(&query_vec, TOP_K);
        let prompt = build_prompt(question, &hits);

        self.client.generate(&self.model, &prompt).await
    }

    /// Force a rebuild of the persisted index, rebinding the loaded copy.
    pub async fn refresh(&mut self) -> Result<(), IndexError> {
        self.manager.refresh().await
    }

    /// Blocking read-evaluate-print loop over stdin.
    ///
    /// Terminates on an exit keyword, end of input, or Ctrl-C. Blank lines
    /// re-prompt without issuing a query; a failed query is reported for
    /// that turn only.
    pub async fn interactive_session(&self) -> Result<()> {
        println!();
        println!("Welcome to ShellAI system query.");
        println!("Ask questions about your system in natural language.");
        println!("Type 'exit', 'quit', or 'q' to stop.");
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"Ask about your system: ").await?;
            stdout.flush().await?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            };

            let Some(line) = line else {
                // EOF
                println!();
                break;
            };

            match classify_input(&line) {
                SessionAction::Exit => break,
                SessionAction::Skip => continue,
                SessionAction::Query(question) => match self.query(&question).await {
                    Ok(answer) => {
                        println!();
                        println!("{}", answer);
                        println!();
                        println!("{}", "-".repeat(50));
                    }
                    Err(e) => {
                        eprintln!("Query failed: {:#}", e);
                    }
                },
            }
        }

        println!("Goodbye.");
        Ok(())
    }
}

/// What to do with one line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Exit,
    Skip,
    Query(String),
}

/// Classify a raw input line: exit keywords end the session, blank input
/// re-prompts, anything else is a question.
pub fn classify_input(line: &str) -> SessionAction {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return SessionAction::Skip;
    }
    if matches!(trimmed.to_lowercase().as_str(), "exit" | "quit" | "q") {
        return SessionAction::Exit;
    }
    SessionAction::Query(trimmed.to_string())
}

/// Build the grounded synthesis prompt from retrieved chunks.
fn build_prompt(question: &str, hits: &[ScoredChunk]) -> String {
    let mut prompt = String::from(
        "You are a system administration assistant. Answer the question using \
         only the system information below. If the information does not cover \
         the question, say so.\n\n",
    );

    for hit in hits {
        prompt.push_str(&format!("[source: {}]\n{}\n\n", hit.artifact, hit.text));
    }

    prompt.push_str(&format!("Question: {}\nAnswer:", question));
    prompt
}

/// Run the `ask` subcommand.
pub async fn run_ask(
    config: &Config,
    system_info_dir: &Path,
    model: &str,
    question: Option<&str>,
    refresh: bool,
) -> Result<()> {
    let mut engine = match QueryEngine::initialize(config, system_info_dir, model).await {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to initialize: {:#}", e);
            eprintln!("Make sure Ollama is running and the model is available.");
            eprintln!("Try: ollama pull {}", model);
            bail!("initialization failed");
        }
    };

    if refresh {
        engine.refresh().await?;
    }

    match question {
        Some(question) => {
            let answer = engine.query(question).await?;
            println!();
            println!("{}", answer);
        }
        None => {
            engine.interactive_session().await?;
        }
    }

    Ok(())
}

/// Run the `refresh` subcommand: initialize, then force a rebuild.
pub async fn run_refresh(config: &Config, system_info_dir: &Path, model: &str) -> Result<()> {
    let mut engine = QueryEngine::initialize(config, system_info_dir, model).await?;
    engine.refresh().await?;
    println!("Index refreshed.");
    Ok(())
}
