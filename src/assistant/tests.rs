use super::*;
use crate::agent::ToolRegistry;
use crate::config::{Config, KnowledgeConfig};
use crate::documents::Document;
use crate::index::Indexer;
use crate::llm::testing::{HashEmbedder, ScriptedChat, tool_call_reply};
use crate::llm::{ChatMessage, EmbeddingModel, Role};
use std::path::PathBuf;
use tempfile::TempDir;

async fn assistant(
    temp_dir: &TempDir,
    replies: Vec<std::result::Result<ChatMessage, String>>,
    embedder: HashEmbedder,
) -> (Assistant, Arc<ScriptedChat>) {
    let config = Config {
        knowledge: KnowledgeConfig {
            docs_dir: temp_dir.path().join("docs"),
            index_dir: None,
        },
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let documents = vec![
        Document {
            source: PathBuf::from("sleep.pdf"),
            page_number: 1,
            text: "For sleep support try Magnesium Bis Blueberry or L-Glycine Vegan Amino Acid."
                .to_string(),
        },
        Document {
            source: PathBuf::from("gut.pdf"),
            page_number: 1,
            text: "Gut health: prebiotic fibre powders and postbiotics.".to_string(),
        },
    ];
    let knowledge_base = Indexer::new(&config, Arc::new(HashEmbedder::default()))
        .build(&documents)
        .await
        .expect("build should succeed");

    let embedder: Arc<dyn EmbeddingModel> = Arc::new(embedder);
    let retriever = Retriever::new(Arc::new(knowledge_base), embedder);
    let scripted = Arc::new(ScriptedChat::new(replies));
    let chat: Arc<dyn ChatModel> = Arc::clone(&scripted) as Arc<dyn ChatModel>;
    let tools = ToolRegistry::with_retrieval(retriever.clone(), "CanPrev", 4);

    let assistant = Assistant::new(
        Agent::new(Arc::clone(&chat), tools, 0.1, 15),
        chat,
        retriever,
        config.catalog.clone(),
        SuggestionSettings::from_config(&config),
    );
    (assistant, scripted)
}

#[tokio::test]
async fn answer_records_exchange_and_carries_history() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let (assistant, scripted) = assistant(
        &temp_dir,
        vec![
            Ok(tool_call_reply("1", "pdf_extractor", r#"{"query":"sleep"}"#)),
            Ok(ChatMessage::assistant("Magnesium Bis Blueberry helps.")),
            Ok(ChatMessage::assistant("Take it before bed.")),
        ],
        HashEmbedder::default(),
    )
    .await;
    let mut session = Session::start();

    let first = assistant
        .answer(&mut session, "What helps with sleep?")
        .await
        .expect("answer should succeed");
    assert_eq!(first, "Magnesium Bis Blueberry helps.");
    assert_eq!(session.history.len(), 2);

    let second = assistant
        .answer(&mut session, "When should I take it?")
        .await
        .expect("answer should succeed");
    assert_eq!(second, "Take it before bed.");
    assert_eq!(session.history.len(), 4);

    let requests = scripted.requests();
    let tool_observation = requests[1]
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("should have tool observation");
    assert!(tool_observation.text().contains("Magnesium Bis Blueberry"));

    let last = &requests[2].messages;
    assert!(last[0].text().contains("concise, factual answers"));
    assert_eq!(last[1].text(), "What helps with sleep?");
    assert_eq!(last[2].text(), "Magnesium Bis Blueberry helps.");
    assert_eq!(last[3].text(), "When should I take it?");
}

#[tokio::test]
async fn failed_answer_leaves_history_alone() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let (assistant, _) = assistant(
        &temp_dir,
        vec![Err("503 Service Unavailable".to_string())],
        HashEmbedder::default(),
    )
    .await;
    let mut session = Session::start();

    assert!(assistant.answer(&mut session, "anything").await.is_err());
    assert!(session.history.is_empty());
}

#[tokio::test]
async fn similar_products_come_from_nearest_passage() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let (assistant, _) = assistant(&temp_dir, Vec::new(), HashEmbedder::default()).await;

    let similar = assistant.similar_products("sleep support").await;
    assert_eq!(
        similar,
        vec!["L-Glycine Vegan Amino Acid", "Magnesium Bis Blueberry"]
    );

    let fallback = assistant.similar_products("gut health prebiotic").await;
    assert_eq!(
        fallback,
        vec!["Curcumin Unlocked", "Active Multi Drink Mix", "Fibre Feel"]
    );
}

#[tokio::test]
async fn similar_products_empty_on_retrieval_failure() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let (assistant, _) = assistant(&temp_dir, Vec::new(), HashEmbedder { fail: true }).await;

    assert!(assistant.similar_products("sleep").await.is_empty());
}

#[tokio::test]
async fn suggestions_are_cached_in_session() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let (assistant, scripted) = assistant(
        &temp_dir,
        vec![Ok(ChatMessage::assistant(r#"["Is K2Drops vegan?"]"#))],
        HashEmbedder::default(),
    )
    .await;
    let mut session = Session::start();

    assert_eq!(
        assistant.suggest(&mut session, "K2D").await,
        vec!["Is K2Drops vegan?"]
    );
    assert_eq!(
        assistant.suggest(&mut session, "K2D").await,
        vec!["Is K2Drops vegan?"]
    );
    assert_eq!(scripted.calls(), 1);
    assert_eq!(session.suggestions.len(), 1);
}
