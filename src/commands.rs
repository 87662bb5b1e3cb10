use anyhow::{Context, Result, anyhow};
use console::style;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::agent::{Agent, ToolRegistry};
use crate::assistant::Assistant;
use crate::autocomplete::SuggestionSettings;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::documents;
use crate::index::{IndexStatus, Indexer, KnowledgeBase};
use crate::llm::{ChatModel, EmbeddingModel, ImageModel, OpenAiClient};
use crate::recipe::{PdfRenderer, RecipeGenerator};
use crate::retrieval::Retriever;
use crate::session::{Exchange, Session};

/// Pause between streamed words
const WORD_DELAY: Duration = Duration::from_millis(20);

/// Last entry of the suggestion picker, asks nothing
const NO_SUGGESTION: &str = "None, keep typing";

/// Model handles shared by every command
struct Models {
    chat: Arc<dyn ChatModel>,
    embedder: Arc<dyn EmbeddingModel>,
    images: Arc<dyn ImageModel>,
}

impl Models {
    fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(&config.api)?);
        Ok(Self {
            chat: Arc::clone(&client) as Arc<dyn ChatModel>,
            embedder: Arc::clone(&client) as Arc<dyn EmbeddingModel>,
            images: client,
        })
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn open_knowledge_base(config: &Config, models: &Models) -> Result<Arc<KnowledgeBase>> {
    let indexer = Indexer::new(config, Arc::clone(&models.embedder));
    let bar = spinner("Loading the knowledge base...");
    let result = indexer.load_or_build().await;
    bar.finish_and_clear();

    let knowledge_base = result.context(
        "Error loading/creating the knowledge base. Please try rebuilding it with `recipe-rag rebuild`",
    )?;
    Ok(Arc::new(knowledge_base))
}

fn knowledge_agent(config: &Config, models: &Models, retriever: &Retriever) -> Agent {
    let tools = ToolRegistry::with_retrieval(
        retriever.clone(),
        &config.catalog.brand,
        config.retrieval.top_k,
    );
    Agent::new(
        Arc::clone(&models.chat),
        tools,
        config.api.answer_temperature,
        config.retrieval.max_agent_iterations,
    )
}

async fn build_assistant(config: &Config, models: &Models) -> Result<Assistant> {
    let knowledge_base = open_knowledge_base(config, models).await?;
    let retriever = Retriever::new(knowledge_base, Arc::clone(&models.embedder));
    Ok(Assistant::new(
        knowledge_agent(config, models, &retriever),
        Arc::clone(&models.chat),
        retriever,
        config.catalog.clone(),
        SuggestionSettings::from_config(config),
    ))
}

/// Rebuild the knowledge base from the PDF corpus
#[inline]
pub async fn rebuild_knowledge_base(config: &Config) -> Result<()> {
    let models = Models::from_config(config)?;
    let indexer = Indexer::new(config, Arc::clone(&models.embedder));

    let bar = spinner("Building the knowledge base from PDF files...");
    let result = indexer.rebuild().await;
    bar.finish_and_clear();

    let knowledge_base = result.context("Failed to build the knowledge base")?;
    let manifest = knowledge_base.manifest();
    println!(
        "{}",
        style("✓ Knowledge Base updated successfully!").green()
    );
    println!("  Generation: {}", manifest.generation);
    println!("  PDF files: {}", manifest.source_files.len());
    println!("  Pages: {}", manifest.page_count);
    println!("  Chunks: {}", manifest.chunk_count);
    Ok(())
}

/// Show the knowledge base and model configuration
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Recipe RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("📄 Corpus:");
    println!("   Directory: {}", config.docs_dir().display());
    match documents::list_pdf_files(config.docs_dir()) {
        Ok(files) => println!("   PDF files: {}", files.len()),
        Err(e) => println!("   ❌ {}", e),
    }
    println!();

    println!("🔍 Knowledge Base:");
    let status = IndexStatus::read(&config.index_dir())?;
    println!("   Directory: {}", status.index_dir.display());
    match &status.live {
        Some(manifest) => {
            println!("   ✅ Live generation: {}", manifest.generation);
            println!(
                "   Built: {}",
                manifest.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("   PDF files: {}", manifest.source_files.len());
            println!("   Pages: {}", manifest.page_count);
            println!("   Chunks: {}", manifest.chunk_count);
            println!("   Vector dimension: {}", manifest.vector_dimension);
        }
        None => println!("   ⚠️  No usable index; it will be built on first use"),
    }
    println!("   Generations on disk: {}", status.generations.len());
    println!();

    println!("🤖 Model API:");
    println!("   Endpoint: {}", config.api.base_url);
    println!("   Chat model: {}", config.api.chat_model);
    println!("   Embedding model: {}", config.api.embedding_model);
    println!("   Image model: {}", config.api.image_model);
    if config.api.api_key().is_some() {
        println!("   ✅ API key found in ${}", config.api.api_key_env);
    } else {
        println!("   ❌ API key missing: set ${}", config.api.api_key_env);
    }

    Ok(())
}

/// List catalog products by category, warning about missing images
#[inline]
pub fn list_products(catalog: &Catalog) {
    println!("{} products", style(&catalog.brand).bold());
    let images = catalog.images();

    for category in &catalog.categories {
        println!();
        println!("{}", style(&category.name).bold().yellow());
        for product in &category.products {
            println!("  • {}", product);
            if let Some(image) = images.iter().find(|i| i.product == *product && !i.exists) {
                println!(
                    "    {}",
                    style(format!("⚠ Image not found: {}", image.path.display())).yellow()
                );
            }
        }
    }
}

/// Answer one question
#[inline]
pub async fn ask(config: &Config, question: &str) -> Result<()> {
    let models = Models::from_config(config)?;
    let assistant = build_assistant(config, &models).await?;
    let mut session = Session::start();

    answer_and_show(&assistant, &mut session, question).await?;
    session.end();
    Ok(())
}

/// Print autocomplete suggestions for a partial question
#[inline]
pub async fn suggest(config: &Config, partial: &str) -> Result<()> {
    let models = Models::from_config(config)?;
    let mut session = Session::start();
    let suggestions = session
        .suggestions
        .suggest(
            partial,
            &models.chat,
            &SuggestionSettings::from_config(config),
        )
        .await;
    print_suggestions(&suggestions);
    session.end();
    Ok(())
}

/// Interactive Q&A session
#[inline]
pub async fn chat(config: &Config) -> Result<()> {
    let models = Models::from_config(config)?;
    let assistant = build_assistant(config, &models).await?;
    let mut session = Session::start();

    println!("{}", style("Product Q&A").bold().cyan());
    println!("Ask a question about our products....");
    println!(
        "{}",
        style("Commands: /suggest <partial>, /history, /quit").dim()
    );

    loop {
        let line: String = Input::new()
            .with_prompt("Search")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;
        let line = line.trim();

        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/history" => print_history(&session),
            _ => {
                let question = match line.strip_prefix("/suggest") {
                    Some(partial) => {
                        let suggestions = assistant.suggest(&mut session, partial.trim()).await;
                        print_suggestions(&suggestions);
                        pick_suggestion(&suggestions)?
                    }
                    None => Some(line.to_string()),
                };
                let Some(question) = question else {
                    continue;
                };
                if let Err(e) = answer_and_show(&assistant, &mut session, &question).await {
                    error!("{:#}", e);
                    eprintln!("{}", style(format!("Error: {:#}", e)).red());
                }
            }
        }
    }

    let summary = session.end();
    info!(
        "Session lasted {}s",
        (summary.ended_at - summary.started_at).num_seconds()
    );
    Ok(())
}

async fn answer_and_show(
    assistant: &Assistant,
    session: &mut Session,
    question: &str,
) -> Result<()> {
    let bar = spinner("Thinking...");
    let result = assistant.answer(session, question).await;
    bar.finish_and_clear();
    let answer = result?;

    stream_words(&answer).await?;

    let similar = assistant.similar_products(question).await;
    if !similar.is_empty() {
        println!();
        println!("{}", style("Similar Products").bold());
        for product in &similar {
            let path = assistant.catalog().image_path(product);
            if path.is_file() {
                println!("  • {} ({})", product, path.display());
            } else {
                println!(
                    "  • {} {}",
                    product,
                    style(format!("(image not found for {})", product)).yellow()
                );
            }
        }
    }
    Ok(())
}

fn print_suggestions(suggestions: &[String]) {
    if suggestions.is_empty() {
        println!("{}", style("No suggestions").dim());
        return;
    }
    println!("{}", style("Suggestions:").bold());
    for suggestion in suggestions {
        println!("  → {}", suggestion);
    }
}

/// Let the user ask one of `suggestions` directly
fn pick_suggestion(suggestions: &[String]) -> Result<Option<String>> {
    if suggestions.is_empty() {
        return Ok(None);
    }

    let choices = suggestion_choices(suggestions);
    let index = Select::new()
        .with_prompt("Ask one of these?")
        .default(choices.len() - 1)
        .items(&choices)
        .interact()
        .context("Failed to read suggestion choice")?;
    Ok(chosen_suggestion(suggestions, index))
}

/// Picker entries: every suggestion, then [`NO_SUGGESTION`]
#[inline]
pub fn suggestion_choices(suggestions: &[String]) -> Vec<&str> {
    suggestions
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(NO_SUGGESTION))
        .collect()
}

/// The suggestion behind picker entry `index`, `None` for [`NO_SUGGESTION`]
#[inline]
pub fn chosen_suggestion(suggestions: &[String], index: usize) -> Option<String> {
    suggestions.get(index).cloned()
}

fn print_history(session: &Session) {
    let pairs = session.history.pairs();
    if pairs.is_empty() {
        println!("{}", style("No conversation yet").dim());
        return;
    }
    println!("{}", style("Conversation").bold());
    for exchange in &pairs {
        println!("{}", render_exchange(exchange));
        println!("{}", "-".repeat(40));
    }
}

/// Text form of one conversation entry
#[inline]
pub fn render_exchange(exchange: &Exchange<'_>) -> String {
    match exchange {
        Exchange::Pair { user, assistant } => format!(
            "{}: {}\n{}: {}",
            user.role.label(),
            user.text(),
            assistant.role.label(),
            assistant.text()
        ),
        Exchange::Unpaired(message) => format!("{}: {}", message.role.label(), message.text()),
    }
}

/// Words of `text`, each followed by a space, in display order
#[inline]
pub fn word_stream(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(' ').map(|word| format!("{word} "))
}

async fn stream_words(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    for word in word_stream(text) {
        write!(stdout, "{}", word)?;
        stdout.flush()?;
        tokio::time::sleep(WORD_DELAY).await;
    }
    writeln!(stdout)?;
    Ok(())
}

/// What the `recipe` command was asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeOptions {
    pub product: String,
    pub instructions: Option<String>,
    pub output_dir: PathBuf,
    pub with_image: bool,
}

/// Generate a recipe, its image and PDF card, then describe the product
#[inline]
pub async fn generate_recipe(config: &Config, options: &RecipeOptions) -> Result<()> {
    let product = config
        .catalog
        .find_product(&options.product)
        .ok_or_else(|| {
            anyhow!(
                "Unknown product '{}'. Run `recipe-rag products` to list the catalog",
                options.product
            )
        })?
        .to_string();

    let models = Models::from_config(config)?;
    let knowledge_base = open_knowledge_base(config, &models).await?;
    let retriever = Retriever::new(knowledge_base, Arc::clone(&models.embedder));
    let generator = RecipeGenerator::new(
        knowledge_agent(config, &models, &retriever),
        Arc::clone(&models.images),
        PdfRenderer::new(Duration::from_secs(config.api.timeout_seconds)),
        &config.catalog.brand,
        &config.api.image_size,
    );

    let bar = spinner("Generating a recipe...");
    let result = generator
        .generate(&product, options.instructions.as_deref(), options.with_image)
        .await;
    bar.finish_and_clear();
    let artifact = result?;

    println!("{}", style("Recipe Details").bold().cyan());
    stream_words(&artifact.text).await?;
    println!();

    if let Some(url) = &artifact.image_url {
        println!("{} {}", style("Recipe Image:").bold(), url);
    } else if options.with_image {
        println!("{}", style("⚠ No recipe image could be generated").yellow());
    }

    let product_image = config.catalog.image_path(&product);
    if product_image.is_file() {
        println!(
            "{} {}",
            style("Product Image:").bold(),
            product_image.display()
        );
    } else {
        println!(
            "{}",
            style(format!("⚠ Image not found: {}", product_image.display())).yellow()
        );
    }

    match generator.render_pdf(&artifact).await {
        Ok(bytes) => {
            let path = write_pdf(&options.output_dir, &artifact.file_name, &bytes)?;
            println!("{} {}", style("✓ Recipe PDF saved to").green(), path.display());
        }
        Err(e) => {
            error!("Recipe PDF failed: {}", e);
            eprintln!("{}", style(format!("⚠ Could not create the PDF: {}", e)).yellow());
        }
    }

    println!();
    println!("{}", style("Product Description").bold().cyan());
    let bar = spinner("Describing the product...");
    let description = generator.describe_product(&product).await;
    bar.finish_and_clear();
    match description {
        Ok(text) => stream_words(&text).await?,
        Err(e) => eprintln!("{}", style(format!("Error: {:#}", e)).red()),
    }

    Ok(())
}

fn write_pdf(output_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;
    let path = output_dir.join(file_name);
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write PDF: {}", path.display()))?;
    Ok(path)
}
