//! Recipe generation: recipe text from the knowledge base, an illustration,
//! and a printable PDF card.

pub mod markdown;
pub mod pdf;


use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::{Agent, prompt};
use crate::llm::ImageModel;
pub use markdown::{extract_name, file_name, strip_markdown};
pub use pdf::{PdfError, PdfRenderer};

/// One generated recipe. Lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeArtifact {
    pub product: String,
    /// Model output as generated
    pub text: String,
    pub name: Option<String>,
    /// `text` without the recipe name line
    pub body: String,
    pub image_url: Option<String>,
    pub file_name: String,
}

pub struct RecipeGenerator {
    agent: Agent,
    images: Arc<dyn ImageModel>,
    renderer: PdfRenderer,
    brand: String,
    image_size: String,
}

impl RecipeGenerator {
    /// `agent` should carry the knowledge base retrieval tool
    #[inline]
    pub fn new(
        agent: Agent,
        images: Arc<dyn ImageModel>,
        renderer: PdfRenderer,
        brand: &str,
        image_size: &str,
    ) -> Self {
        Self {
            agent,
            images,
            renderer,
            brand: brand.to_string(),
            image_size: image_size.to_string(),
        }
    }

    /// Generate a recipe featuring `product`, then optionally an image of it
    #[inline]
    pub async fn generate(
        &self,
        product: &str,
        instructions: Option<&str>,
        with_image: bool,
    ) -> Result<RecipeArtifact> {
        let query = prompt::recipe_query(product, instructions);
        info!("Generating recipe for '{}'", query);

        let text = self
            .agent
            .run(&prompt::recipe_system(&self.brand), &[], &query)
            .await
            .context("Recipe generation failed")?;

        let image_url = if with_image {
            self.illustrate(&text).await
        } else {
            None
        };

        let (name, body) = extract_name(&text);
        let file_name = file_name(name.as_deref());

        Ok(RecipeArtifact {
            product: product.to_string(),
            text,
            name,
            body,
            image_url,
            file_name,
        })
    }

    /// Image URL for a dish described by `recipe_text`, or `None` when the
    /// image model fails
    #[inline]
    pub async fn illustrate(&self, recipe_text: &str) -> Option<String> {
        let images = Arc::clone(&self.images);
        let image_prompt = prompt::image_prompt(recipe_text, &self.brand);
        let size = self.image_size.clone();

        match tokio::task::spawn_blocking(move || images.generate_image(&image_prompt, &size)).await
        {
            Ok(Ok(url)) => Some(url),
            Ok(Err(e)) => {
                warn!("Recipe image generation failed: {:#}", e);
                None
            }
            Err(e) => {
                warn!("Recipe image task failed: {}", e);
                None
            }
        }
    }

    /// Benefits, key ingredients and usage of `product` from the knowledge base
    #[inline]
    pub async fn describe_product(&self, product: &str) -> Result<String> {
        let query = prompt::product_description_query(&self.brand, product);
        self.agent
            .run(&prompt::recipe_system(&self.brand), &[], &query)
            .await
            .context("Product description failed")
    }

    /// Render the recipe card, downloading the image if there is one
    #[inline]
    pub async fn render_pdf(&self, artifact: &RecipeArtifact) -> Result<Vec<u8>, PdfError> {
        let renderer = self.renderer.clone();
        let name = artifact.name.clone();
        let image_url = artifact.image_url.clone();
        let body = artifact.body.clone();

        tokio::task::spawn_blocking(move || {
            renderer.render(name.as_deref(), image_url.as_deref(), &body)
        })
        .await
        .map_err(|e| PdfError::Layout(format!("Render task failed: {}", e)))?
    }
}
