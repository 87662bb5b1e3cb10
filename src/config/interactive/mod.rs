
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{ApiConfig, ApiFlavor, Config, ConfigError};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Recipe RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Model API Configuration").bold().yellow());
    eprintln!("Configure the OpenAI-compatible endpoint used for chat, embeddings and images.");
    eprintln!();

    configure_api(&mut config.api)?;

    eprintln!();
    eprintln!("{}", style("Knowledge Base").bold().yellow());
    let docs_dir: String = Input::new()
        .with_prompt("Directory of product PDFs")
        .default(config.knowledge.docs_dir.display().to_string())
        .interact_text()?;
    config.knowledge.docs_dir = docs_dir.into();

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if config.api.api_key().is_none() {
        eprintln!(
            "{}",
            style(format!(
                "⚠ Warning: environment variable {} is not set",
                config.api.api_key_env
            ))
            .yellow()
        );
    }

    if test_api_connection(&config.api)? {
        eprintln!("{}", style("✓ API endpoint reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the model API").yellow()
        );
        eprintln!("You can continue, but the API must be reachable before asking questions.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    let flavor = match config.api.flavor {
        ApiFlavor::OpenAi => "openai",
        ApiFlavor::Azure => "azure",
    };

    eprintln!("{}", style("API Settings:").bold().yellow());
    eprintln!("  Flavor: {}", style(flavor).cyan());
    match config.api_url() {
        Ok(url) => eprintln!("  Base URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Base URL: {} ({})", style("Invalid").red(), e),
    }
    if let Some(version) = &config.api.api_version {
        eprintln!("  API Version: {}", style(version).cyan());
    }
    let key_state = if config.api.api_key().is_some() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!(
        "  API Key: {} ({})",
        style(&config.api.api_key_env).cyan(),
        key_state
    );
    eprintln!("  Chat Model: {}", style(&config.api.chat_model).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.api.embedding_model).cyan()
    );
    eprintln!("  Image Model: {}", style(&config.api.image_model).cyan());

    eprintln!();
    eprintln!("{}", style("Knowledge Base:").bold().yellow());
    eprintln!(
        "  Documents: {}",
        style(config.docs_dir().display()).cyan()
    );
    eprintln!("  Index: {}", style(config.index_dir().display()).cyan());
    eprintln!(
        "  Chunking: {} chars, {} overlap",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    let exists = config_dir.join("config.toml").exists();
    match Config::load(config_dir) {
        Ok(config) if exists => {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        }
        Ok(config) => {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(config)
        }
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("Existing configuration is invalid ({e}). Using defaults.")).yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        }
    }
}

fn configure_api(api: &mut ApiConfig) -> Result<()> {
    let flavors = &["openai", "azure"];
    let default_index = match api.flavor {
        ApiFlavor::OpenAi => 0,
        ApiFlavor::Azure => 1,
    };

    let flavor_index = Select::new()
        .with_prompt("API flavor")
        .default(default_index)
        .items(flavors)
        .interact()?;

    let flavor = if flavor_index == 1 {
        ApiFlavor::Azure
    } else {
        ApiFlavor::OpenAi
    };

    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(api.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = ApiConfig {
                base_url: input.clone(),
                ..ApiConfig::default()
            };
            temp_config.base_url()?;
            Ok(())
        })
        .interact_text()?;

    let api_version = if flavor == ApiFlavor::Azure {
        let version: String = Input::new()
            .with_prompt("Azure API version")
            .default(
                api.api_version
                    .clone()
                    .unwrap_or_else(|| "2024-02-01".to_string()),
            )
            .interact_text()?;
        Some(version)
    } else {
        None
    };

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(api.api_key_env.clone())
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model (deployment name for Azure)")
        .default(api.chat_model.clone())
        .validate_with(non_empty)
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(api.embedding_model.clone())
        .validate_with(non_empty)
        .interact_text()?;

    let image_model: String = Input::new()
        .with_prompt("Image model")
        .default(api.image_model.clone())
        .validate_with(non_empty)
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding requests")
        .default(api.embedding_batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    api.set_flavor(flavor, api_version);
    api.set_base_url(base_url)?;
    api.set_api_key_env(api_key_env)?;
    api.set_chat_model(chat_model)?;
    api.set_embedding_model(embedding_model)?;
    api.set_image_model(image_model)?;
    api.set_embedding_batch_size(batch_size)?;

    Ok(())
}

fn non_empty(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Value cannot be empty")
    } else {
        Ok(())
    }
}

fn test_api_connection(api: &ApiConfig) -> Result<bool> {
    let url = api.base_url()?.join("models")?;

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    let mut request = agent.get(url.as_str());
    if let Some(key) = api.api_key() {
        request = match api.flavor {
            ApiFlavor::OpenAi => request.header("Authorization", &format!("Bearer {key}")),
            ApiFlavor::Azure => request.header("api-key", &key),
        };
    }

    match request.call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
