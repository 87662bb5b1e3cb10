use super::*;
use crate::llm::Role;
use crate::llm::testing::{ScriptedChat, tool_call_reply};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde_json::json;

struct CatalogTool;

#[async_trait]
impl Tool for CatalogTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "pdf_extractor".to_string(),
            description: "lookup".to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    async fn invoke(&self, arguments: &Value) -> Result<String> {
        match arguments.get("query").and_then(Value::as_str) {
            Some("fail") => bail!("index unavailable"),
            Some(query) => Ok(format!("passage about {query}")),
            None => bail!("Missing required parameter: query"),
        }
    }
}

fn agent(chat: &Arc<ScriptedChat>, max_iterations: usize) -> Agent {
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(CatalogTool));
    let chat: Arc<dyn ChatModel> = Arc::clone(chat) as Arc<dyn ChatModel>;
    Agent::new(chat, tools, 0.1, max_iterations)
}

#[tokio::test]
async fn direct_answer_takes_one_round() {
    let chat = Arc::new(ScriptedChat::answering("It supports sleep."));

    let history = [ChatMessage::user("earlier"), ChatMessage::assistant("reply")];

    let answer = agent(&chat, 15)
        .run("system", &history, "What does it do?")
        .await
        .expect("run should succeed");

    assert_eq!(answer, "It supports sleep.");
    let requests = chat.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature, Some(0.1));
    assert_eq!(requests[0].tools.len(), 1);
    let roles: Vec<Role> = requests[0].messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
}

#[tokio::test]
async fn tool_observation_is_fed_back() {
    let chat = Arc::new(ScriptedChat::new(vec![
        Ok(tool_call_reply("call_1", "pdf_extractor", r#"{"query":"K2Drops"}"#)),
        Ok(ChatMessage::assistant("K2Drops supports bone health.")),
    ]));

    let answer = agent(&chat, 15)
        .run("system", &[], "Tell me about K2Drops")
        .await
        .expect("run should succeed");

    assert_eq!(answer, "K2Drops supports bone health.");
    let requests = chat.requests();
    assert_eq!(requests.len(), 2);
    let second = &requests[1].messages;
    assert_eq!(second.len(), 4);
    assert_eq!(second[2].tool_calls[0].id, "call_1");
    assert_eq!(second[3].role, Role::Tool);
    assert_eq!(second[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(second[3].text(), "passage about K2Drops");
}

#[tokio::test]
async fn unknown_tool_and_bad_arguments_become_observations() {
    let chat = Arc::new(ScriptedChat::new(vec![
        Ok(tool_call_reply("a", "web_search", r#"{"query":"x"}"#)),
        Ok(tool_call_reply("b", "pdf_extractor", "{not json")),
        Ok(ChatMessage::assistant("done")),
    ]));

    let answer = agent(&chat, 15)
        .run("system", &[], "question")
        .await
        .expect("run should succeed");
    assert_eq!(answer, "done");

    let last = chat.requests().pop().expect("should have requests");
    let observations: Vec<&str> = last
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(ChatMessage::text)
        .collect();
    assert_eq!(observations.len(), 2);
    assert_eq!(
        observations[0],
        "web_search is not a valid tool, try one of [pdf_extractor]."
    );
    assert!(observations[1].starts_with("Invalid JSON arguments for pdf_extractor"));
}

#[tokio::test]
async fn iteration_cap_is_an_error() {
    let chat = Arc::new(ScriptedChat::new(vec![
        Ok(tool_call_reply("1", "pdf_extractor", r#"{"query":"a"}"#)),
        Ok(tool_call_reply("2", "pdf_extractor", r#"{"query":"b"}"#)),
        Ok(ChatMessage::assistant("too late")),
    ]));

    let error = agent(&chat, 2)
        .run("system", &[], "question")
        .await
        .expect_err("run should hit the cap");

    assert!(error.to_string().contains("2 rounds"));
    assert_eq!(chat.calls(), 2);
}

#[tokio::test]
async fn model_and_tool_failures_propagate() {
    let chat = Arc::new(ScriptedChat::new(vec![Err("rate limited".to_string())]));
    let error = agent(&chat, 15)
        .run("system", &[], "question")
        .await
        .expect_err("model failure should propagate");
    assert!(format!("{:#}", error).contains("rate limited"));

    let chat = Arc::new(ScriptedChat::new(vec![Ok(tool_call_reply(
        "1",
        "pdf_extractor",
        r#"{"query":"fail"}"#,
    ))]));
    let error = agent(&chat, 15)
        .run("system", &[], "question")
        .await
        .expect_err("tool failure should propagate");
    assert!(format!("{:#}", error).contains("index unavailable"));
}
