//! Environment check for first-time use.

use anyhow::Result;

use crate::config::Config;
use crate::ollama::OllamaClient;

/// Run the `setup` subcommand: verify the configuration and probe the
/// Ollama service, printing actionable hints for anything missing.
pub async fn run_setup(config: &Config, config_path: &std::path::Path) -> Result<()> {
    println!("Checking ShellAI setup...");
    println!();
    println!("Config file:      {}", config_path.display());
    println!("Ollama base URL:  {}", config.ollama.base_url);
    println!("Default model:    {}", config.ollama.default_model);
    println!("Embedding model:  {}", config.embedding.model);
    println!(
        "Output directory: {}",
        config.system_info.output_dir.display()
    );
    println!();

    let client = OllamaClient::new(&config.ollama.base_url, config.ollama.request_timeout)?;
    match client.list_models().await {
        Ok(models) => {
            println!("Ollama is available.");
            if models.is_empty() {
                println!("No models installed.");
                println!("Try: ollama pull {}", config.ollama.default_model);
            } else {
                println!("Available models: {}", models.join(", "));
                if !models.iter().any(|m| m.starts_with(&config.embedding.model)) {
                    println!(
                        "Embedding model '{}' not installed. Try: ollama pull {}",
                        config.embedding.model, config.embedding.model
                    );
                }
            }
        }
        Err(e) => {
            println!("Ollama not available: {:#}", e);
            println!("Install from: https://ollama.ai");
        }
    }

    println!();
    println!("Setup check complete. Try:");
    println!("  shellai collect    # Collect system info");
    println!("  shellai ask        # Ask questions about your system");

    Ok(())
}
