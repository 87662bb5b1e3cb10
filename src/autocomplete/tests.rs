use super::*;
use crate::llm::testing::ScriptedChat;

fn chat(replies: Vec<Result<ChatMessage, String>>) -> (Arc<ScriptedChat>, Arc<dyn ChatModel>) {
    let scripted = Arc::new(ScriptedChat::new(replies));
    let model: Arc<dyn ChatModel> = Arc::clone(&scripted) as Arc<dyn ChatModel>;
    (scripted, model)
}

fn reply(text: &str) -> Result<ChatMessage, String> {
    Ok(ChatMessage::assistant(text))
}

#[tokio::test]
async fn short_partial_makes_no_call() {
    let (scripted, model) = chat(vec![reply(r#"["a"]"#)]);
    let mut cache = SuggestionCache::new();
    let settings = SuggestionSettings::default();

    assert!(cache.suggest("", &model, &settings).await.is_empty());
    assert!(cache.suggest("ma", &model, &settings).await.is_empty());
    // Two characters, four bytes
    assert!(cache.suggest("éé", &model, &settings).await.is_empty());

    assert_eq!(scripted.calls(), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn cached_partial_makes_no_call() {
    let (scripted, model) = chat(vec![reply(
        r#"["Does Magnesium Bis Blueberry help sleep?", "Is magnesium vegan?", "How much magnesium per day?"]"#,
    )]);
    let mut cache = SuggestionCache::new();
    let settings = SuggestionSettings::default();

    let first = cache.suggest("magn", &model, &settings).await;
    let second = cache.suggest("magn", &model, &settings).await;

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(scripted.calls(), 1);
}

#[tokio::test]
async fn request_uses_suggestion_prompt_and_sampling() {
    let (scripted, model) = chat(vec![reply("[]")]);
    let mut cache = SuggestionCache::new();
    let settings = SuggestionSettings::default();

    cache.suggest("collagen", &model, &settings).await;

    let request = scripted.requests().pop().expect("should record request");
    assert_eq!(request.temperature, Some(0.3));
    assert_eq!(request.max_tokens, Some(150));
    assert!(request.tools.is_empty());
    assert!(request.messages[0].text().contains("autocomplete suggestions"));
    assert!(request.messages[1].text().contains("'collagen'"));
}

#[tokio::test]
async fn failures_cache_empty_list() {
    let (scripted, model) = chat(vec![
        reply("Sure! Here are some ideas"),
        reply(r#"{"suggestions": ["a"]}"#),
        Err("HTTP 500".to_string()),
    ]);
    let mut cache = SuggestionCache::new();
    let settings = SuggestionSettings::default();

    assert!(cache.suggest("not json", &model, &settings).await.is_empty());
    assert!(cache.suggest("an object", &model, &settings).await.is_empty());
    assert!(cache.suggest("transport", &model, &settings).await.is_empty());
    assert_eq!(cache.get("not json"), Some(&[][..]));
    assert_eq!(cache.len(), 3);

    assert!(cache.suggest("transport", &model, &settings).await.is_empty());
    assert_eq!(scripted.calls(), 3);
}

#[tokio::test]
async fn long_lists_are_truncated() {
    let (_, model) = chat(vec![reply(r#"["a", "b", "c", "d", "e"]"#)]);
    let mut cache = SuggestionCache::new();

    let suggestions = cache
        .suggest("fibre", &model, &SuggestionSettings::default())
        .await;
    assert_eq!(suggestions, vec!["a", "b", "c"]);
}

#[test]
fn parse_tolerates_code_fences() {
    let fenced = "```json\n[\"What is K2Drops?\", \"Is K2Drops vegan?\"]\n```";
    assert_eq!(
        parse_suggestions(fenced).expect("should parse"),
        vec!["What is K2Drops?", "Is K2Drops vegan?"]
    );
    assert_eq!(
        parse_suggestions("```[\"x\"]```").expect("should parse"),
        vec!["x"]
    );
}

#[test]
fn parse_skips_non_strings() {
    assert_eq!(
        parse_suggestions(r#"["ok", 3, null, "  ", "fine"]"#).expect("should parse"),
        vec!["ok", "fine"]
    );
    assert!(parse_suggestions("\"just a string\"").expect("should parse").is_empty());
    assert!(parse_suggestions("nope").is_err());
}
