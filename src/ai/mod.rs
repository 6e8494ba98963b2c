//! Chat-completion client for dream roadmaps and suggestions.
//!
//! Prompts are fixed templates parameterized by a handful of profile and
//! dream fields. Models sometimes wrap the requested JSON in prose, so
//! parsing falls back to extracting the first JSON object from the reply.
//! There are no retries; a failed call surfaces as an error (roadmaps) or
//! falls back to a hardcoded suggestion list (suggestions).

use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Profile;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// A generated dream roadmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub title: String,
    pub steps: Vec<RoadmapStep>,
}

/// One step on a roadmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapStep {
    pub order: i64,
    pub title: String,
    pub description: String,
}

/// A dream idea offered to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamSuggestion {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionList {
    suggestions: Vec<DreamSuggestion>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Client for the chat-completion API. Disabled when no key is configured.
pub struct AiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl AiClient {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a step-by-step roadmap toward a dream.
    pub async fn generate_roadmap(
        &self,
        profile: &Profile,
        dream_title: &str,
        dream_description: &str,
    ) -> Result<Roadmap, AppError> {
        let age = profile
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let grade = profile.grade.as_deref().unwrap_or("unknown");

        let prompt = format!(
            "A child (age {age}, grade {grade}) has this dream: \"{dream_title}\" — {dream_description}. \
             Create an encouraging roadmap of 4 to 6 concrete, age-appropriate steps toward it. \
             Respond with JSON only: {{\"title\": string, \"steps\": [{{\"order\": number, \"title\": string, \"description\": string}}]}}"
        );

        let content = self
            .chat(
                "You are a warm mentor helping children plan toward their dreams.",
                &prompt,
            )
            .await?;

        parse_payload(&content)
            .ok_or_else(|| AppError::Ai("roadmap reply was not valid JSON".to_string()))
    }

    /// Suggest dream ideas for a child of the given age and grade.
    ///
    /// Never fails: any error is logged and the hardcoded defaults are
    /// returned instead.
    pub async fn dream_suggestions(
        &self,
        age: Option<i64>,
        grade: Option<&str>,
    ) -> Vec<DreamSuggestion> {
        if !self.enabled() {
            return default_suggestions();
        }

        let age = age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let grade = grade.unwrap_or("unknown");

        let prompt = format!(
            "Suggest 4 inspiring, achievable dreams for a child of age {age} in grade {grade}. \
             Respond with JSON only: {{\"suggestions\": [{{\"title\": string, \"description\": string}}]}}"
        );

        match self
            .chat("You suggest uplifting dream ideas for children.", &prompt)
            .await
        {
            Ok(content) => match parse_payload::<SuggestionList>(&content) {
                Some(list) if !list.suggestions.is_empty() => list.suggestions,
                _ => {
                    tracing::warn!("Suggestion reply was not valid JSON, using defaults");
                    default_suggestions()
                }
            },
            Err(err) => {
                tracing::warn!("Suggestion request failed, using defaults: {}", err);
                default_suggestions()
            }
        }
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, AppError> {
        let Some(key) = &self.api_key else {
            return Err(AppError::AiUnavailable);
        };

        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": DEFAULT_MODEL,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "temperature": 0.7
        });

        let response = self.http.post(&url).bearer_auth(key).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Ai(format!(
                "chat completion returned {}",
                status
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Ai("chat completion returned no choices".to_string()))
    }
}

/// Parse the model reply, falling back to extracting the first JSON object
/// when it is wrapped in prose.
fn parse_payload<T: DeserializeOwned>(content: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str(content) {
        return Some(value);
    }
    let extracted = extract_json(content)?;
    serde_json::from_str(&extracted).ok()
}

fn extract_json(content: &str) -> Option<String> {
    let pattern = Regex::new(r"(?s)\{.*\}").ok()?;
    pattern.find(content).map(|m| m.as_str().to_string())
}

/// Fallback suggestions used when the AI client is disabled or fails.
pub fn default_suggestions() -> Vec<DreamSuggestion> {
    [
        (
            "Aprender a tocar un instrumento",
            "Elige un instrumento que te guste y practica un poco cada semana.",
        ),
        (
            "Ayudar a los animales",
            "Participa como voluntario en un refugio o cuida a las mascotas de tu barrio.",
        ),
        (
            "Escribir mi propio cuento",
            "Inventa personajes y escribe una historia capítulo a capítulo.",
        ),
        (
            "Ser más valiente al hablar en clase",
            "Practica levantar la mano una vez al día para compartir tus ideas.",
        ),
    ]
    .into_iter()
    .map(|(title, description)| DreamSuggestion {
        title: title.to_string(),
        description: description.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_json() {
        let roadmap: Roadmap = parse_payload(
            r#"{"title": "Astronauta", "steps": [{"order": 1, "title": "Estudiar", "description": "Ciencias"}]}"#,
        )
        .unwrap();
        assert_eq!(roadmap.title, "Astronauta");
        assert_eq!(roadmap.steps.len(), 1);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let content = "Sure! Here is the roadmap you asked for:\n\n\
            {\"title\": \"Chef\", \"steps\": [{\"order\": 1, \"title\": \"Cocinar\", \"description\": \"Con ayuda\"}]}\n\
            Let me know if you want more steps.";
        let roadmap: Roadmap = parse_payload(content).unwrap();
        assert_eq!(roadmap.title, "Chef");
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_payload::<Roadmap>("no json here").is_none());
        assert!(parse_payload::<Roadmap>("{not json}").is_none());
    }

    #[test]
    fn test_default_suggestions_nonempty() {
        assert_eq!(default_suggestions().len(), 4);
    }

    #[tokio::test]
    async fn test_disabled_client_returns_defaults() {
        let client = AiClient::new(None, "http://localhost".to_string());
        assert!(!client.enabled());
        let suggestions = client.dream_suggestions(Some(10), Some("5th")).await;
        assert_eq!(suggestions.len(), default_suggestions().len());
    }

    #[tokio::test]
    async fn test_disabled_client_cannot_generate_roadmap() {
        let client = AiClient::new(None, "http://localhost".to_string());
        let profile = Profile {
            id: "u".to_string(),
            display_name: "Ana".to_string(),
            grade: None,
            school: None,
            city: None,
            country: None,
            age: Some(9),
            sex: None,
            avatar_url: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let result = client.generate_roadmap(&profile, "Pilota", "Volar aviones").await;
        assert!(matches!(result, Err(AppError::AiUnavailable)));
    }
}
