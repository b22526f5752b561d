//! Generation Gateway
//!
//! Contract between the state machine and the content-generation backend. The
//! engine treats the backend as an opaque function from (invocation, input) to
//! (structured payload, metadata); any backend failure surfaces as a
//! `Generation` error and is never retried internally.

use crate::course::{Assessment, Course, CourseMetadata, LearningObjective, Topic};
use crate::error::EngineError;
use crate::invocation::{InvocationNumber, InvocationPayload};
use crate::types::CourseId;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Read-only view of the course handed to the backend as grounding context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSnapshot {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub metadata: CourseMetadata,
    pub learning_objectives: Vec<LearningObjective>,
    pub structure: Vec<Topic>,
    pub assessments: Vec<Assessment>,
}

impl From<&Course> for CourseSnapshot {
    fn from(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            metadata: course.metadata.clone(),
            learning_objectives: course.learning_objectives.clone(),
            structure: course.structure.clone(),
            assessments: course.assessments.clone(),
        }
    }
}

/// One generation request: which stage, for which course, with what history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub invocation: InvocationNumber,
    pub course_id: CourseId,
    /// Result of the previous round when revising
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_result: Option<InvocationPayload>,
    /// Reviewer feedback accumulated across revise rounds, oldest first
    #[serde(default)]
    pub feedback: Vec<String>,
    pub snapshot: CourseSnapshot,
}

/// Backend-reported details about one generation round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub model: String,
    pub tokens_used: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct GenerationReply {
    pub payload: InvocationPayload,
    pub metadata: GenerationMetadata,
}

/// The backend seam. Implementations must be cancel-free: once called, the
/// engine waits for the round-trip to finish.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply, EngineError>;
}

const GATEWAY_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn map_http_error(error: reqwest::Error) -> EngineError {
    if error.is_timeout() {
        EngineError::Generation(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        EngineError::Generation(format!("Connection error: {}", error))
    } else if let Some(status) = error.status() {
        EngineError::Generation(format!("Request failed with status {}: {}", status, error))
    } else {
        EngineError::Generation(format!("HTTP error: {}", error))
    }
}

// OpenAI-compatible chat API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Gateway backed by an OpenAI-compatible chat endpoint.
pub struct HttpGenerationGateway {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

impl HttpGenerationGateway {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, EngineError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(GATEWAY_CONNECT_TIMEOUT)
            .timeout(request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            temperature: None,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn from_config(config: &crate::config::GatewayConfig) -> Result<Self, EngineError> {
        let gateway = Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.api_key.clone(),
            Some(Duration::from_secs(config.timeout_secs)),
        )?;
        Ok(match config.temperature {
            Some(temperature) => gateway.with_temperature(temperature),
            None => gateway,
        })
    }

    fn system_prompt(invocation: InvocationNumber) -> String {
        let shape = match invocation {
            InvocationNumber::Description => {
                r#"{"description": "...", "assistance_tier": "full|guided|minimal"}"#
            }
            InvocationNumber::Objectives => {
                r#"{"learning_objectives": [{"code": "LO1", "text": "...", "bloom_level": "remember|understand|apply|analyze|evaluate|create"}]}"#
            }
            InvocationNumber::Structure => {
                r#"{"topics": [{"title": "...", "subtopics": [{"title": "...", "lessons": [{"title": "...", "duration_minutes": 30}]}]}]}"#
            }
            InvocationNumber::FullBuild => {
                r#"{"topics": [...], "assessments": [{"question": "...", "options": ["..."], "correct_answer": "...", "linked_objective": "LO1"}]}"#
            }
            InvocationNumber::TemplateMapping => {
                r#"{"mappings": [{"section": "...", "template_slot": "...", "evidence_grade": "A|B|C|D"}]}"#
            }
        };
        format!(
            "You are an instructional design assistant producing the \"{}\" stage of a course. \
             Respond with a single JSON object of the form: {}",
            invocation.label(),
            shape
        )
    }

    fn user_prompt(request: &GenerationRequest) -> Result<String, EngineError> {
        let context = serde_json::to_string(&request.snapshot)
            .map_err(|e| EngineError::Generation(format!("Failed to encode snapshot: {}", e)))?;
        let mut prompt = format!("Course context:\n{}\n", context);
        if let Some(prior) = &request.prior_result {
            let prior_json = serde_json::to_string(prior)
                .map_err(|e| EngineError::Generation(format!("Failed to encode prior result: {}", e)))?;
            prompt.push_str(&format!("\nPrevious result:\n{}\n", prior_json));
        }
        if !request.feedback.is_empty() {
            prompt.push_str("\nReviewer feedback, oldest first:\n");
            for item in &request.feedback {
                prompt.push_str(&format!("- {}\n", item));
            }
        }
        Ok(prompt)
    }
}

#[async_trait]
impl GenerationGateway for HttpGenerationGateway {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply, EngineError> {
        let wire_request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt(request.invocation),
                },
                WireMessage {
                    role: "user".to_string(),
                    content: Self::user_prompt(&request)?,
                },
            ],
            temperature: self.temperature,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            course_id = %request.course_id,
            invocation = %request.invocation,
            model = %self.model,
            "Generation request sent"
        );

        let start = Instant::now();
        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        let response = builder
            .json(&wire_request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EngineError::Generation(format!(
                "Backend returned {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Generation(format!("Failed to parse response: {}", e)))?;
        let duration = start.elapsed();

        let choice = completion
            .choices
            .first()
            .ok_or_else(|| EngineError::Generation("No choices in response".to_string()))?;
        let document: serde_json::Value =
            serde_json::from_str(&choice.message.content).map_err(|e| {
                EngineError::Generation(format!("Backend emitted non-JSON content: {}", e))
            })?;
        let payload = InvocationPayload::from_backend_json(request.invocation, document)?;

        info!(
            course_id = %request.course_id,
            invocation = %request.invocation,
            model = %completion.model,
            duration_ms = duration.as_millis() as u64,
            "Generation response received"
        );

        Ok(GenerationReply {
            payload,
            metadata: GenerationMetadata {
                model: completion.model,
                tokens_used: completion.usage.map(|u| u.total_tokens).unwrap_or(0),
                duration_ms: duration.as_millis() as u64,
            },
        })
    }
}
