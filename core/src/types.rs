use serde::{Deserialize, Serialize};

/// Role of a single conversation turn.
///
/// The set is closed: anything else fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The leading turn carrying instructions and the document text
    #[serde(rename = "system")]
    Context,
    User,
    #[serde(alias = "model")]
    Assistant,
}

impl Role {
    /// Role name understood by the Gemini API.
    ///
    /// Gemini only knows `user` and `model`, so the context turn travels as `user`.
    pub fn as_gemini_role(&self) -> &'static str {
        match self {
            Role::Context | Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

/// One role-tagged entry in the conversation sent to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Self::new(Role::Context, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Content {
            parts: vec![Part::text(turn.text.clone())],
            role: Some(turn.role.as_gemini_role().to_string()),
        }
    }
}

/// Request to Gemini API to generate content
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content structure for requests
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Part structure for a piece of content
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: String) -> Self {
        Self { text: Some(text) }
    }
}

/// Generation configuration options
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
}

/// One streamed response chunk from Gemini API
#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl GenerateContentResponse {
    /// Text of every part of every candidate, in emission order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
    }
}

/// Candidate in the response
#[derive(Deserialize, Debug)]
pub struct Candidate {
    pub content: Option<ContentResponsePart>,
}

/// Content part in the response
#[derive(Deserialize, Debug)]
pub struct ContentResponsePart {
    #[serde(default)]
    pub parts: Vec<PartResponse>,
    pub role: Option<String>,
}

/// Part response from the API
#[derive(Deserialize, Debug)]
pub struct PartResponse {
    pub text: Option<String>,
}

/// Error object the API may emit in place of a response chunk
#[derive(Deserialize, Debug)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_decoding() {
        let turn: Turn = serde_json::from_str(r#"{"role":"assistant","text":"Hello"}"#).unwrap();
        assert_eq!(turn, Turn::assistant("Hello"));

        let turn: Turn = serde_json::from_str(r#"{"role":"model","text":"Hi"}"#).unwrap();
        assert_eq!(turn.role, Role::Assistant);

        let turn: Turn = serde_json::from_str(r#"{"role":"system","text":"ctx"}"#).unwrap();
        assert_eq!(turn.role, Role::Context);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result: Result<Turn, _> = serde_json::from_str(r#"{"role":"narrator","text":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_turn_to_gemini_content() {
        let content = Content::from(&Turn::assistant("Hello"));
        assert_eq!(content.role.as_deref(), Some("model"));
        assert_eq!(content.parts[0].text.as_deref(), Some("Hello"));

        let content = Content::from(&Turn::context("doc"));
        assert_eq!(content.role.as_deref(), Some("user"));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content::from(&Turn::user("Hi"))],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.5),
                max_output_tokens: None,
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Hi");
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
        assert!(value["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_response_texts_in_order() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "a"}, {"text": "b"}], "role": "model"}},
                {"content": null},
                {"content": {"parts": [{"text": "c"}]}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.texts().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
