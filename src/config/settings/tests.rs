use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.api.flavor, ApiFlavor::OpenAi);
    assert_eq!(config.api.base_url, "https://api.openai.com/v1");
    assert_eq!(config.api.chat_model, "gpt-4o");
    assert_eq!(config.api.image_size, "1024x1024");
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.chunk_overlap, 100);
    assert_eq!(config.retrieval.top_k, 4);
    assert_eq!(config.retrieval.max_agent_iterations, 15);
    assert_eq!(config.knowledge.docs_dir, PathBuf::from("docs"));
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.api.base_url = "ftp://example.com".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.api.chat_model = "  ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.api.embedding_batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.api.answer_temperature = 3.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.api.image_size = "big".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_overlap = invalid_config.chunking.chunk_size;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::OverlapTooLarge(1000, 1000))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.retrieval.max_agent_iterations = 0;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn azure_requires_api_version() {
    let mut config = Config::default();
    config.api.set_flavor(ApiFlavor::Azure, None);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingApiVersion)
    ));

    config
        .api
        .set_flavor(ApiFlavor::Azure, Some("2024-02-01".to_string()));
    assert!(config.validate().is_ok());
}

#[test]
fn base_url_gets_trailing_slash() {
    let mut config = Config::default();
    config.api.base_url = "http://localhost:8080/v1/".to_string();

    let url = config
        .api_url()
        .expect("should generate api url successfully");
    assert_eq!(url.as_str(), "http://localhost:8080/v1/");
    assert_eq!(
        url.join("chat/completions")
            .expect("should join path")
            .as_str(),
        "http://localhost:8080/v1/chat/completions"
    );
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let toml_str = r#"
        [api]
        chat_model = "gpt-4o-mini"

        [retrieval]
        top_k = 8
    "#;

    let config: Config = toml::from_str(toml_str).expect("should parse toml correctly");
    assert_eq!(config.api.chat_model, "gpt-4o-mini");
    assert_eq!(config.api.embedding_model, "text-embedding-ada-002");
    assert_eq!(config.retrieval.top_k, 8);
    assert_eq!(config.retrieval.min_suggestion_chars, 3);
    assert_eq!(config.chunking.chunk_size, 1000);
}

#[test]
fn setter_validation() {
    let mut api = ApiConfig::default();

    assert!(api.set_base_url("https://example.com/openai".to_string()).is_ok());
    assert!(api.set_chat_model("gpt-4.1".to_string()).is_ok());
    assert!(api.set_embedding_model("text-embedding-3-small".to_string()).is_ok());
    assert!(api.set_image_model("dall-e-2".to_string()).is_ok());
    assert!(api.set_api_key_env("AZURE_OPENAI_API_KEY".to_string()).is_ok());
    assert!(api.set_embedding_batch_size(128).is_ok());
    assert!(api.set_embedding_dimension(1024).is_ok());

    assert!(api.set_base_url("not a url".to_string()).is_err());
    assert!(api.set_chat_model(String::new()).is_err());
    assert!(api.set_api_key_env(" ".to_string()).is_err());
    assert!(api.set_embedding_batch_size(0).is_err());
    assert!(api.set_embedding_dimension(32).is_err());

    assert_eq!(api.base_url, "https://example.com/openai");
    assert_eq!(api.embedding_batch_size, 128);
}

#[test]
fn image_size_parsing() {
    assert_eq!(parse_image_size("1024x1024"), Some((1024, 1024)));
    assert_eq!(parse_image_size("1792x1024"), Some((1792, 1024)));
    assert_eq!(parse_image_size("0x1024"), None);
    assert_eq!(parse_image_size("1024"), None);
}

#[test]
fn load_missing_config_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("should load default config");
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.index_dir(), temp_dir.path().join("index"));
    assert_eq!(config.api, ApiConfig::default());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = Config::load(temp_dir.path()).expect("should load default config");
    config.api.chat_model = "gpt-4o-mini".to_string();
    config.knowledge.index_dir = Some(temp_dir.path().join("custom-index"));
    config.save().expect("should save config");

    assert!(config.config_file_path().exists());

    let loaded = Config::load(temp_dir.path()).expect("should reload config");
    assert_eq!(loaded.api.chat_model, "gpt-4o-mini");
    assert_eq!(loaded.index_dir(), temp_dir.path().join("custom-index"));
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[chunking]\nchunk_size = 50\n",
    )
    .expect("should write config file");

    assert!(Config::load(temp_dir.path()).is_err());
}
