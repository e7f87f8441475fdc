//! Capabilities and their dispatch.
//!
//! Tool dispatch is a closed tagged union: every capability the assistant
//! can invoke is a [`ToolRequest`] variant, parsed from the model's tool
//! call and dispatched through one `match`. Unknown tool names and
//! capability failures become textual results fed back to the model, never
//! control-flow exceptions.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use flowgraph_core::{ToolCall, ToolDefinition};
use flowgraph_rag::RagEngine;

use crate::cache::TtlCache;

const WEATHER_TTL: Duration = Duration::from_secs(10 * 60);
const DEFINITION_TTL: Duration = Duration::from_secs(60 * 60);

/// A parsed capability request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    Weather { city: String },
    Define { word: String },
    WebSearch { query: String },
    RetrieveDocs { query: String },
}

impl ToolRequest {
    /// Parse a model tool call into a capability request. Unknown names or
    /// missing arguments yield `None`; the caller turns that into a textual
    /// error result.
    pub fn from_call(call: &ToolCall) -> Option<Self> {
        let arg = |key: &str| {
            call.arguments
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        match call.name.as_str() {
            "get_weather" => Some(ToolRequest::Weather { city: arg("city")? }),
            "define_word" => Some(ToolRequest::Define { word: arg("word")? }),
            "web_search" => Some(ToolRequest::WebSearch { query: arg("query")? }),
            "retrieve_docs" => Some(ToolRequest::RetrieveDocs { query: arg("query")? }),
            _ => None,
        }
    }

    /// Tool definitions offered to the model.
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "get_weather".into(),
                description: "Current weather conditions for a city".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {"city": {"type": "string"}},
                    "required": ["city"],
                }),
            },
            ToolDefinition {
                name: "define_word".into(),
                description: "Dictionary definition of an English word".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {"word": {"type": "string"}},
                    "required": ["word"],
                }),
            },
            ToolDefinition {
                name: "web_search".into(),
                description: "Search the web for a short factual answer".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"],
                }),
            },
            ToolDefinition {
                name: "retrieve_docs".into(),
                description: "Retrieve passages from the indexed document collection".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"],
                }),
            },
        ]
    }
}

/// Weather lookup over a fixed condition table, TTL-cached per city.
pub struct WeatherLookup {
    conditions: HashMap<String, String>,
    cache: Mutex<TtlCache<String>>,
}

impl Default for WeatherLookup {
    fn default() -> Self {
        let conditions = [
            ("london", "Cloudy, 15°C"),
            ("paris", "Sunny, 22°C"),
            ("tokyo", "Rainy, 18°C"),
            ("new york", "Partly cloudy, 20°C"),
            ("oslo", "Snow, -2°C"),
            ("sydney", "Sunny, 26°C"),
        ]
        .into_iter()
        .map(|(city, conditions)| (city.to_string(), conditions.to_string()))
        .collect();
        Self {
            conditions,
            cache: Mutex::new(TtlCache::new(WEATHER_TTL)),
        }
    }
}

impl WeatherLookup {
    pub fn lookup(&self, city: &str) -> String {
        let key = city.trim().to_lowercase();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(&key) {
            debug!(city = %key, "weather cache hit");
            return cached.clone();
        }
        let report = match self.conditions.get(&key) {
            Some(conditions) => format!("Weather in {key}: {conditions}"),
            None => format!("No weather data available for '{key}'"),
        };
        cache.insert(key, report.clone());
        report
    }
}

/// Dictionary lookup over a fixed definition table, TTL-cached per word.
pub struct Dictionary {
    definitions: HashMap<String, String>,
    cache: Mutex<TtlCache<String>>,
}

impl Default for Dictionary {
    fn default() -> Self {
        let definitions = [
            ("serendipity", "the occurrence of events by chance in a happy or beneficial way"),
            ("ephemeral", "lasting for a very short time"),
            ("ubiquitous", "present, appearing, or found everywhere"),
            ("resilient", "able to withstand or recover quickly from difficult conditions"),
            ("pragmatic", "dealing with things sensibly and realistically"),
        ]
        .into_iter()
        .map(|(word, definition)| (word.to_string(), definition.to_string()))
        .collect();
        Self {
            definitions,
            cache: Mutex::new(TtlCache::new(DEFINITION_TTL)),
        }
    }
}

impl Dictionary {
    pub fn define(&self, word: &str) -> String {
        let key = word.trim().to_lowercase();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(&key) {
            return cached.clone();
        }
        let entry = match self.definitions.get(&key) {
            Some(definition) => format!("{key}: {definition}"),
            None => format!("No definition found for '{word}'"),
        };
        cache.insert(key, entry.clone());
        entry
    }
}

/// Web search via the DuckDuckGo Instant Answer API. Failures come back as
/// result text.
pub struct WebSearch {
    client: reqwest::Client,
}

impl Default for WebSearch {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl WebSearch {
    pub async fn search(&self, query: &str) -> String {
        let request = self
            .client
            .get("https://api.duckduckgo.com/")
            .query(&[("q", query), ("format", "json"), ("no_html", "1")]);

        let body: Value = match request.send().await {
            Ok(response) => match response.json().await {
                Ok(body) => body,
                Err(e) => return format!("Search failed: {e}"),
            },
            Err(e) => return format!("Search failed: {e}"),
        };

        if let Some(abstract_text) = body.get("AbstractText").and_then(Value::as_str) {
            if !abstract_text.is_empty() {
                return abstract_text.to_string();
            }
        }
        if let Some(topic) = body
            .get("RelatedTopics")
            .and_then(Value::as_array)
            .and_then(|topics| topics.first())
            .and_then(|t| t.get("Text"))
            .and_then(Value::as_str)
        {
            return topic.to_string();
        }
        format!("No search results found for '{query}'")
    }
}

/// Document retrieval over the RAG store.
pub struct DocRetrieval {
    engine: Arc<RagEngine>,
    top_k: usize,
}

impl DocRetrieval {
    pub fn new(engine: Arc<RagEngine>) -> Self {
        Self { engine, top_k: 3 }
    }

    pub async fn retrieve(&self, query: &str) -> String {
        match self.engine.search(query, self.top_k).await {
            Ok(hits) if hits.is_empty() => format!("No documents matched '{query}'"),
            Ok(hits) => hits
                .iter()
                .enumerate()
                .map(|(i, hit)| format!("[{}] {}", i + 1, hit.text))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => format!("Document retrieval failed: {e}"),
        }
    }
}

/// The assistant's capability set, dispatched through one match.
pub struct ToolKit {
    weather: WeatherLookup,
    dictionary: Dictionary,
    search: WebSearch,
    retrieval: Option<DocRetrieval>,
}

impl Default for ToolKit {
    fn default() -> Self {
        Self {
            weather: WeatherLookup::default(),
            dictionary: Dictionary::default(),
            search: WebSearch::default(),
            retrieval: None,
        }
    }
}

impl ToolKit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the document-retrieval capability.
    pub fn with_retrieval(mut self, engine: Arc<RagEngine>) -> Self {
        self.retrieval = Some(DocRetrieval::new(engine));
        self
    }

    /// Execute one capability request, returning its textual result.
    pub async fn dispatch(&self, request: ToolRequest) -> String {
        match request {
            ToolRequest::Weather { city } => self.weather.lookup(&city),
            ToolRequest::Define { word } => self.dictionary.define(&word),
            ToolRequest::WebSearch { query } => self.search.search(&query).await,
            ToolRequest::RetrieveDocs { query } => match &self.retrieval {
                Some(retrieval) => retrieval.retrieve(&query).await,
                None => "Document retrieval is not configured".to_string(),
            },
        }
    }

    /// Execute a raw model tool call. Unparseable calls get a textual error
    /// result instead of aborting the turn.
    pub async fn execute_call(&self, call: &ToolCall) -> String {
        match ToolRequest::from_call(call) {
            Some(request) => self.dispatch(request).await,
            None => format!("Unknown tool or malformed arguments: '{}'", call.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn known_calls_parse_into_variants() {
        let parsed = ToolRequest::from_call(&call("get_weather", json!({"city": "Oslo"})));
        assert_eq!(parsed, Some(ToolRequest::Weather { city: "Oslo".into() }));

        let parsed = ToolRequest::from_call(&call("define_word", json!({"word": "ephemeral"})));
        assert_eq!(parsed, Some(ToolRequest::Define { word: "ephemeral".into() }));
    }

    #[test]
    fn unknown_name_or_missing_arg_is_none() {
        assert_eq!(ToolRequest::from_call(&call("launch_rocket", json!({}))), None);
        assert_eq!(ToolRequest::from_call(&call("get_weather", json!({}))), None);
    }

    #[test]
    fn weather_lookup_normalizes_city() {
        let weather = WeatherLookup::default();
        let report = weather.lookup("  OSLO ");
        assert!(report.contains("Snow"));
        // Served from cache under the normalized key.
        assert_eq!(weather.lookup("oslo"), report);
    }

    #[test]
    fn unknown_city_gets_textual_fallback() {
        let weather = WeatherLookup::default();
        assert!(weather.lookup("Atlantis").contains("No weather data"));
    }

    #[test]
    fn dictionary_defines_known_words() {
        let dictionary = Dictionary::default();
        assert!(dictionary.define("Ephemeral").contains("short time"));
        assert!(dictionary.define("xyzzy").contains("No definition"));
    }

    #[tokio::test]
    async fn unknown_tool_call_becomes_error_text() {
        let toolkit = ToolKit::new();
        let result = toolkit.execute_call(&call("launch_rocket", json!({}))).await;
        assert!(result.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn retrieval_unconfigured_is_reported() {
        let toolkit = ToolKit::new();
        let result = toolkit
            .dispatch(ToolRequest::RetrieveDocs { query: "anything".into() })
            .await;
        assert!(result.contains("not configured"));
    }
}
