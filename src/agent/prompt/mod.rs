//! Prompt text and message assembly


use crate::llm::ChatMessage;

/// Characters of recipe text quoted in the image prompt
pub const IMAGE_PROMPT_EXCERPT_CHARS: usize = 200;

const RECIPE_SYSTEM: &str = "\
You are a recipe generator specializing in {brand} products. A user will select a specific {brand} product, \
and your task is to generate an innovative recipe that highlights that product as the core ingredient. \
Use the following structured format for your response:

**Product Name:** Clearly mention the selected {brand} product.

**Recipe Format:**
- **Recipe Name:** A creative and descriptive name for the recipe.
- **Description:** Explain the health benefits of the selected {brand} product and its role in the recipe.
- **Preparation Time & Servings:** Provide the estimated time required and number of servings.
- **Ingredients:** List all ingredients with their measurements.
- **Method:** Provide step-by-step instructions for preparing the recipe.
- **Product Attribution:** Ensure the selected {brand} product is prominently featured in the description.

Strictly use the provided {brand} product as the core ingredient. If the necessary details to generate a \
recipe are not available in the context, respond with: 'Recipe generation is not available in the context'.";

const SEARCH_SYSTEM: &str = "\
You are an helpful assistant that provides concise, factual answers by retrieving and synthesizing relevant \
information from a provided knowledge base. Answer only based on the retrieved documents and avoid \
adding any extra commentary.";

const SUGGESTION_SYSTEM: &str = "\
You are an assistant that provides autocomplete suggestions for product questions, \
with a special focus on {brand}'s innovative health and wellness products. \
Return your answer as a JSON array of strings without any additional explanation.";

fn with_brand(template: &str, brand: &str) -> String {
    template.replace("{brand}", brand)
}

/// System instruction for recipe generation
#[inline]
pub fn recipe_system(brand: &str) -> String {
    with_brand(RECIPE_SYSTEM, brand)
}

/// System instruction for knowledge base Q&A
#[inline]
pub fn search_system() -> String {
    SEARCH_SYSTEM.to_string()
}

#[inline]
pub fn suggestion_system(brand: &str) -> String {
    with_brand(SUGGESTION_SYSTEM, brand)
}

#[inline]
pub fn suggestion_user(brand: &str, partial: &str, count: usize) -> String {
    format!(
        "Given the following partial question about {brand} products: '{partial}', \
         provide {} complete suggestions to finish this question that specifically reference \
         {brand}'s range of health and wellness products. \
         Return the suggestions as a JSON array of strings using double quotes for the strings, \
         and do not include any extra text.",
        count_word(count)
    )
}

fn count_word(count: usize) -> String {
    match count {
        1 => "one".to_string(),
        2 => "two".to_string(),
        3 => "three".to_string(),
        4 => "four".to_string(),
        5 => "five".to_string(),
        n => n.to_string(),
    }
}

/// The recipe query: product name, then any extra wishes
#[inline]
pub fn recipe_query(product: &str, instructions: Option<&str>) -> String {
    match instructions.map(str::trim).filter(|s| !s.is_empty()) {
        Some(extra) => format!("{product} {extra}"),
        None => product.to_string(),
    }
}

/// Image prompt quoting the start of the recipe. The brand is named only to
/// keep it out of the picture.
#[inline]
pub fn image_prompt(recipe_text: &str, brand: &str) -> String {
    let excerpt: String = recipe_text.chars().take(IMAGE_PROMPT_EXCERPT_CHARS).collect();
    format!(
        "Generate a mouthwatering, high-quality, photorealistic image featuring a dish \
         of: {excerpt}. Present the dish in a clean, inviting \
         setting with soft, natural lighting that highlights the vibrant colors and textures. \
         Emphasize fresh ingredients, attractive plating, and subtle garnishes to evoke a \
         sense of culinary delight. Ensure the final image is visually captivating and \
         appetizing, making viewers want to taste it immediately. Focus more on the image to show. \
         Remember do not add any {brand} Product's name in the Image, just focus on the dish."
    )
}

#[inline]
pub fn product_description_query(brand: &str, product: &str) -> String {
    format!(
        "Provide a detailed product description for the {brand} product '{product}'. \
         Include information about its benefits, key ingredients, and usage instructions, \
         based on the internal knowledge base."
    )
}

/// Messages for one model call: system instruction, prior turns in order,
/// then the current input
#[inline]
pub fn assemble(system: &str, history: &[ChatMessage], input: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(input));
    messages
}
