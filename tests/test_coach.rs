//! End-to-end: session JSON in, answer text out, through the public API.

use fusbuddy::config::LlmSettings;
use fusbuddy::credentials::EnvSource;
use fusbuddy::llm::Transport;
use fusbuddy::store::{ConfigStore, ProviderPreference};
use fusbuddy::{Coach, SessionContext};

const FILLET_CONTEXT: &str = r#"{
    "document": {"name": "Bracket v3"},
    "workspace": {"id": "FusionSolidEnvironment", "name": "Design"},
    "selection": {
        "count": 1,
        "types": {"Fusion::BRepEdge": 1},
        "items": [{"objectType": "Fusion::BRepEdge", "name": null}]
    },
    "design": {"rootComponent": "Bracket", "bodies": 1, "sketches": 2, "occurrences": 0, "components": 1}
}"#;

fn offline_coach(dir: &tempfile::TempDir) -> Coach {
    let store = ConfigStore::new(dir.path().join("config.json"));
    Coach::new(Transport::Offline, LlmSettings::default(), store)
        .with_env(EnvSource::fixed([("GEMINI_API_KEY", "AIza-should-never-be-used")]))
}

#[tokio::test]
async fn fillet_question_without_transport_gets_template() {
    let dir = tempfile::TempDir::new().unwrap();
    let coach = offline_coach(&dir);
    let ctx = SessionContext::from_json(FILLET_CONTEXT).unwrap();

    let text = coach.answer("How do I fillet this edge?", &ctx).await;

    assert!(text.contains("**Goal (from you):** How do I fillet this edge?"));
    assert!(text.contains("1 item(s) selected"));
    assert!(text.contains("1× BRepEdge"));
    assert!(text.contains("Working in Design on *Bracket v3*."));
    for step in ["1. Identify", "2. Locate", "3. Adjust", "4. Confirm"] {
        assert!(text.contains(step), "missing step '{step}'");
    }
    assert!(!text.contains("AIza"));
}

#[tokio::test]
async fn unreachable_provider_still_answers() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("config.json"));
    store.set_provider_preference(ProviderPreference::Auto).unwrap();
    store.set_openai_api_key("sk-test123456789").unwrap();

    // Port 9 (discard) on localhost refuses connections in the test environment.
    let mut settings = LlmSettings::default();
    settings.openai.api_base_url = "http://127.0.0.1:9/v1/chat/completions".into();
    settings.gemini.api_base_url = "http://127.0.0.1:9/v1beta/models".into();

    let coach = Coach::new(Transport::connect(2), settings, store)
        .with_env(EnvSource::fixed(Vec::<(String, String)>::new()));
    let ctx = SessionContext::from_json(FILLET_CONTEXT).unwrap();

    assert!(coach.try_llm("q", &ctx).await.is_err());
    let text = coach.answer("How do I fillet this edge?", &ctx).await;
    assert!(text.starts_with("**Goal (from you):** How do I fillet this edge?"));
}

#[test]
fn stored_key_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("FusBuddy360").join("config.json"));

    store.set_openai_api_key("sk-test123456789").unwrap();
    assert_eq!(store.get_openai_api_key().as_deref(), Some("sk-test123456789"));
    assert!(store.set_openai_api_key("   ").is_err());
    assert_eq!(store.get_openai_api_key().as_deref(), Some("sk-test123456789"));
}

#[tokio::test]
async fn null_sections_from_host_still_get_an_answer() {
    let dir = tempfile::TempDir::new().unwrap();
    let coach = offline_coach(&dir);
    let ctx = SessionContext::from_json(
        r#"{"document": null, "workspace": null, "selection": {"count": 2, "types": null, "items": null}, "design": null}"#,
    )
    .unwrap();

    let text = coach.answer("How do I shell this body?", &ctx).await;

    assert!(text.contains("**Goal (from you):** How do I shell this body?"));
    assert!(text.contains("Working in your current workspace on *your current design*."));
    assert!(text.contains("You have 2 item(s) selected."));
}
