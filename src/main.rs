use anyhow::Result;
use clap::{Parser, Subcommand};
use recipe_rag::commands::{
    RecipeOptions, ask, chat, generate_recipe, list_products, rebuild_knowledge_base,
    show_status, suggest,
};
use recipe_rag::config::{Config, get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recipe-rag")]
#[command(about = "Product Q&A and recipe generation over a PDF knowledge base")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the index (defaults to the user config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the model API and knowledge base locations
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build or update the knowledge base from the PDF corpus
    Rebuild,
    /// Show the state of the knowledge base and model configuration
    Status,
    /// List catalog products by category
    Products,
    /// Ask one question about the products
    Ask {
        question: String,
    },
    /// Suggest completions for a partial question
    Suggest {
        partial: String,
    },
    /// Start an interactive Q&A session
    Chat,
    /// Generate a recipe featuring a product, with an image and a PDF card
    Recipe {
        /// Catalog product name
        #[arg(long)]
        product: String,
        /// How the recipe should be, e.g. "vegan, spicy, extra protein"
        #[arg(long)]
        instructions: Option<String>,
        /// Directory the PDF is written to
        #[arg(long, default_value = ".")]
        output: PathBuf,
        /// Skip image generation
        #[arg(long)]
        no_image: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    if let Commands::Config { show } = cli.command {
        if show {
            show_config(&config_dir)?;
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(());
    }

    let config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Rebuild => {
            rebuild_knowledge_base(&config).await?;
        }
        Commands::Status => {
            show_status(&config)?;
        }
        Commands::Products => {
            list_products(&config.catalog);
        }
        Commands::Ask { question } => {
            ask(&config, &question).await?;
        }
        Commands::Suggest { partial } => {
            suggest(&config, &partial).await?;
        }
        Commands::Chat => {
            chat(&config).await?;
        }
        Commands::Recipe {
            product,
            instructions,
            output,
            no_image,
        } => {
            let options = RecipeOptions {
                product,
                instructions,
                output_dir: output,
                with_image: !no_image,
            };
            generate_recipe(&config, &options).await?;
        }
    }

    Ok(())
}
