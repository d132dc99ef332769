use std::collections::VecDeque;

use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::errors::{GeminiError, GeminiResult};
use crate::provider::{FragmentProvider, FragmentStream};
use crate::types::*;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for streaming content from the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(config: GeminiConfig) -> GeminiResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            GeminiError::ConfigError(
                "API key is required to initialize the Gemini client".to_string(),
            )
        })?;

        Ok(Self {
            client: Client::new(),
            config,
            api_key,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model_name
        )
    }

    fn create_stream_request(&self, turns: &[Turn]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: turns.iter().map(Content::from).collect(),
            generation_config: self.config.temperature.map(|temperature| GenerationConfig {
                temperature: Some(temperature),
                ..Default::default()
            }),
        }
    }
}

#[async_trait]
impl FragmentProvider for GeminiClient {
    async fn stream(&self, turns: &[Turn]) -> GeminiResult<FragmentStream> {
        let request = self.create_stream_request(turns);

        let response = self
            .client
            .post(self.stream_url())
            .query(&[("alt", "sse")])
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                GeminiError::RequestError(format!("Failed to send request: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GeminiError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        debug!(model = %self.config.model_name, turns = turns.len(), "Opened Gemini stream");
        Ok(fragment_stream(response.bytes_stream().eventsource().boxed()))
    }
}

type EventResult = Result<Event, EventStreamError<reqwest::Error>>;

struct StreamState {
    events: BoxStream<'static, EventResult>,
    ready: VecDeque<GeminiResult<Option<String>>>,
    done: bool,
}

/// Turns SSE events into fragments, one per candidate part.
fn fragment_stream(events: BoxStream<'static, EventResult>) -> FragmentStream {
    let state = StreamState {
        events,
        ready: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.events.next().await {
                Some(Ok(event)) => state.ready.extend(parse_payload(&event.data)),
                Some(Err(err)) => {
                    state.done = true;
                    state.ready.push_back(Err(stream_error(err)));
                }
                None => state.done = true,
            }
        }
    }))
}

fn stream_error(err: EventStreamError<reqwest::Error>) -> GeminiError {
    match err {
        EventStreamError::Transport(e) => GeminiError::StreamError(e.without_url().to_string()),
        other => GeminiError::StreamError(other.to_string()),
    }
}

fn parse_payload(payload: &str) -> Vec<GeminiResult<Option<String>>> {
    let response = match serde_json::from_str::<GenerateContentResponse>(payload) {
        Ok(response) => response,
        Err(e) => {
            return vec![Err(GeminiError::ParsingError(format!(
                "Failed to parse stream chunk: {}",
                e
            )))]
        }
    };

    if let Some(error) = response.error {
        return vec![Err(GeminiError::ApiError(format!(
            "{} ({})",
            error.message,
            error.status.unwrap_or_else(|| "UNKNOWN".to_string())
        )))];
    }

    let texts: Vec<_> = response
        .texts()
        .map(|text| Ok(Some(text.to_string())))
        .collect();
    if texts.is_empty() {
        vec![Ok(None)]
    } else {
        texts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.url(),
            ..GeminiConfig::default()
        })
        .unwrap()
    }

    fn sse_event(text: &str) -> String {
        format!(
            "data: {{\"candidates\": [{{\"content\": {{\"parts\": [{{\"text\": \"{}\"}}], \"role\": \"model\"}}}}]}}\r\n\r\n",
            text
        )
    }

    async fn collect(mut stream: FragmentStream) -> Vec<GeminiResult<Option<String>>> {
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        items
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = GeminiClient::new(GeminiConfig::default());
        assert!(matches!(result, Err(GeminiError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_in_order() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "{}{}data: {{\"candidates\": [{{\"finishReason\": \"STOP\"}}]}}\r\n\r\n",
            sse_event("Hi "),
            sse_event("there")
        );
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:streamGenerateContent")
            .match_query(Matcher::Exact("alt=sse".into()))
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let stream = client
            .stream(&[Turn::context("doc"), Turn::user("Hello")])
            .await
            .unwrap();
        let items: Vec<_> = collect(stream)
            .await
            .into_iter()
            .map(|item| item.unwrap())
            .collect();

        assert_eq!(
            items,
            vec![Some("Hi ".to_string()), Some("there".to_string()), None]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_sends_gemini_roles() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:streamGenerateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex(r#""role":"model""#.to_string()))
            .with_status(200)
            .with_body(sse_event("ok"))
            .create_async()
            .await;

        let client = client_for(&server);
        let stream = client
            .stream(&[Turn::context("doc"), Turn::assistant("Earlier answer")])
            .await
            .unwrap();
        assert_eq!(collect(stream).await.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_reports_http_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:streamGenerateContent")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("{\"error\": {\"message\": \"bad key\"}}")
            .create_async()
            .await;

        let client = client_for(&server);
        match client.stream(&[Turn::user("Hello")]).await {
            Err(GeminiError::HttpError { status_code, message }) => {
                assert_eq!(status_code, 403);
                assert!(message.contains("bad key"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an HTTP error"),
        }
    }

    #[tokio::test]
    async fn test_stream_surfaces_in_band_error() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "{}data: {{\"error\": {{\"code\": 500, \"message\": \"overloaded\", \"status\": \"UNAVAILABLE\"}}}}\r\n\r\n",
            sse_event("partial ")
        );
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:streamGenerateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let items = collect(client.stream(&[Turn::user("Hello")]).await.unwrap()).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().as_deref(), Some("partial "));
        assert!(matches!(&items[1], Err(GeminiError::ApiError(msg)) if msg.contains("overloaded")));
    }

    #[test]
    fn test_parse_payload_rejects_garbage() {
        let items = parse_payload("not json");
        assert!(matches!(items.as_slice(), [Err(GeminiError::ParsingError(_))]));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: Some("SECRET-KEY-123".to_string()),
            base_url: "http://127.0.0.1:1".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();

        match client.stream(&[Turn::user("Hello")]).await {
            Err(GeminiError::RequestError(message)) => {
                assert!(!message.contains("SECRET-KEY-123"));
                assert!(!message.contains("127.0.0.1"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a connection failure"),
        }
    }

    #[tokio::test]
    async fn test_stream_accepts_bare_cr_line_endings() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "data: {{\"candidates\": [{{\"content\": {{\"parts\": [{{\"text\": \"Hi \"}}]}}}}]}}\r\r{}",
            sse_event("there").replace("\r\n", "\n")
        );
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:streamGenerateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let items: Vec<_> = collect(client.stream(&[Turn::user("Hello")]).await.unwrap())
            .await
            .into_iter()
            .map(|item| item.unwrap())
            .collect();
        assert_eq!(items, vec![Some("Hi ".to_string()), Some("there".to_string())]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_ends_stream_with_error() {
        let mut server = mockito::Server::new_async().await;
        let mut body = b"\xffdata: {\"a\": 1}\n\n".to_vec();
        body.extend_from_slice(sse_event("lost").as_bytes());
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:streamGenerateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let items = collect(client.stream(&[Turn::user("Hello")]).await.unwrap()).await;
        assert!(matches!(items.last(), Some(Err(GeminiError::StreamError(_)))));
    }
}
