//! Workflow definition and execution trace, as delivered by the host runtime.
//!
//! The shapes follow the nflow REST payloads: camelCase keys, unknown keys ignored, list
//! fields optional.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateType {
    Start,
    Normal,
    Manual,
    End,
    Error,
    /// A type string this crate does not know; styled like `normal`.
    Other(String),
}

impl StateType {
    pub fn as_str(&self) -> &str {
        match self {
            StateType::Start => "start",
            StateType::Normal => "normal",
            StateType::Manual => "manual",
            StateType::End => "end",
            StateType::Error => "error",
            StateType::Other(raw) => raw.as_str(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "start" => StateType::Start,
            "normal" => StateType::Normal,
            "manual" => StateType::Manual,
            "end" => StateType::End,
            "error" => StateType::Error,
            other => StateType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StateType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StateType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StateType::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub state_type: Option<StateType>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transitions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<String>,
}

impl State {
    pub fn new(id: impl Into<String>, state_type: StateType) -> Self {
        Self {
            id: id.into(),
            state_type: Some(state_type),
            description: String::new(),
            transitions: Vec::new(),
            on_failure: None,
        }
    }

    /// Placeholder for a state that only appears in the execution trace.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state_type: None,
            description: String::new(),
            transitions: Vec::new(),
            on_failure: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_transitions<I, S>(mut self, transitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transitions = transitions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_on_failure(mut self, target: impl Into<String>) -> Self {
        self.on_failure = Some(target.into());
        self
    }

    pub fn is_end(&self) -> bool {
        matches!(self.state_type, Some(StateType::End))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub states: Vec<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
}

impl Definition {
    pub fn new(states: Vec<State>, on_error: Option<String>) -> Self {
        Self {
            name: None,
            states,
            on_error,
        }
    }

    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub state: String,
    #[serde(default)]
    pub retry_no: u32,
}

impl Action {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            retry_no: 0,
        }
    }

    pub fn retry(state: impl Into<String>, retry_no: u32) -> Self {
        Self {
            state: state.into(),
            retry_no,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.retry_no > 0
    }
}

/// One execution of a definition. `actions` are newest first, as the backend returns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub state: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Workflow {
    pub fn new(state: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            state: state.into(),
            actions,
        }
    }

    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn touches(&self, state_id: &str) -> bool {
        self.actions.iter().any(|a| a.state == state_id)
    }
}
