//! Shared fixtures for agent integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use ukbsearch_agent::{AgentSettings, DictionaryAgent, ToolRegistry};
use ukbsearch_dictionary::{DictionaryStore, SqliteDictionary};
use ukbsearch_provider::{ChatParams, ChatResponse, Provider, ProviderError, ToolCall};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

pub const FIXTURE: &str = r#"
INSERT INTO category (category_id, title, descript) VALUES
    (100, 'Baseline characteristics', NULL),
    (101, 'Blood pressure', NULL);
INSERT INTO encoding (encoding_id, title, descript) VALUES (9, 'Sex', NULL);
INSERT INTO field (field_id, title, value_type, units, main_category, encoding_id, notes, num_participants, item_count) VALUES
    (31, 'Sex', 'Categorical single', NULL, 100, 9, 'Sex as recorded at recruitment', 502000, 502000),
    (34, 'Year of birth', 'Integer', 'years', 100, 0, NULL, 502000, 502000),
    (4080, 'Systolic blood pressure, automated reading', 'Integer', 'mmHg', 101, 0, NULL, 475000, 1900000);
INSERT INTO esimpint (encoding_id, value, meaning, showcase_order) VALUES
    (9, 0, 'Female', 1),
    (9, 1, 'Male', 2);
INSERT INTO recommended (field_id, reason) VALUES (31, 'Core demographic');
"#;

pub fn fixture_store() -> Arc<dyn DictionaryStore> {
    let store = SqliteDictionary::open_in_memory().unwrap();
    store.execute_batch(FIXTURE).unwrap();
    Arc::new(store)
}

pub fn registry() -> ToolRegistry {
    ToolRegistry::with_dictionary(fixture_store())
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

/// Every request the mock received, in order
#[derive(Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<ChatParams>>>,
}

impl Recorder {
    pub fn record(&self, params: &ChatParams) {
        self.requests.lock().unwrap().push(params.clone());
    }

    pub fn requests(&self) -> Vec<ChatParams> {
        self.requests.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Mock that replays `responses` in order and records each request
pub fn scripted(responses: Vec<Result<ChatResponse, ProviderError>>) -> (MockProvider, Recorder) {
    let recorder = Recorder::default();
    let script = Arc::new(Mutex::new(responses.into_iter()));

    let mut mock = MockProvider::new();
    let rec = recorder.clone();
    mock.expect_chat().returning(move |params| {
        rec.record(&params);
        script
            .lock()
            .unwrap()
            .next()
            .expect("mock provider ran out of scripted responses")
    });
    mock.expect_default_model()
        .returning(|| "glm-4.5-flash".to_string());
    mock.expect_is_configured().returning(|| true);

    (mock, recorder)
}

pub fn agent(provider: MockProvider) -> DictionaryAgent<MockProvider> {
    DictionaryAgent::new(provider, registry(), AgentSettings::default())
}
