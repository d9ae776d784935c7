//! Request and response bodies of the chat API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A chat message, optionally routed through a named scenario.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            scenario: None,
        }
    }

    /// Use the given scenario. An empty name means the default scenario.
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        let scenario = scenario.into();
        self.scenario = (!scenario.is_empty()).then_some(scenario);
        self
    }
}

/// A chat message with prompt template variables.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct VariablesChatRequest {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,
}

/// Reply of the non-streaming chat endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
}

/// Lookup status of a streamed session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    NotFound,
}

/// Content the server holds for a streamed session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionContent {
    #[serde(default)]
    pub content: String,
    pub status: SessionStatus,
}

impl SessionContent {
    pub fn is_found(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// The scenario currently selected on the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentScenario {
    pub scenario: String,
}

/// A new scenario and its prompt template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioTemplate {
    pub scenario: String,
    pub template: String,
}

/// Acknowledgement returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub message: String,
}
