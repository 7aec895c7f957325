//! Validation messages reported by the engine
//!
//! Every finding carries a stable string code. External tooling matches on these codes, so
//! the code constants declared next to each rule must never change once published.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity levels for messages
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational messages
    Info,
    /// Warnings that should be addressed
    Warning,
    /// Errors that must be fixed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Reference to the object (and optionally the property of it) a message is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectProperty {
    /// Path of the object, see [`crate::cmpt::ProductCmpt::part_path`]
    pub object: String,
    /// Property name, e.g. `minCardinality`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl ObjectProperty {
    pub fn new(object: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            property: Some(property.into()),
        }
    }

    pub fn object(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            property: None,
        }
    }
}

impl fmt::Display for ObjectProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property {
            Some(property) => write!(f, "{}.{}", self.object, property),
            None => write!(f, "{}", self.object),
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Stable message code
    pub code: String,
    pub severity: Severity,
    /// Human-readable message
    pub text: String,
    /// Objects and properties the message is about
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_properties: Vec<ObjectProperty>,
}

impl Message {
    /// Create a new message
    pub fn new(code: impl Into<String>, severity: Severity, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity,
            text: text.into(),
            invalid_properties: Vec::new(),
        }
    }

    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, text)
    }

    pub fn warning(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, text)
    }

    /// Attach an object property reference
    pub fn with_property(mut self, object: impl Into<String>, property: impl Into<String>) -> Self {
        self.invalid_properties
            .push(ObjectProperty::new(object, property));
        self
    }

    /// Attach an object reference without a specific property
    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.invalid_properties.push(ObjectProperty::object(object));
        self
    }

    /// Check whether this message references the given object
    pub fn refers_to(&self, object: &str) -> bool {
        self.invalid_properties.iter().any(|op| op.object == object)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.text)
    }
}

/// Ordered collection of messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn append(&mut self, other: MessageList) {
        self.messages.extend(other.messages);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Highest severity in the list, `None` when empty
    pub fn severity(&self) -> Option<Severity> {
        self.messages.iter().map(|m| m.severity).max()
    }

    pub fn contains_error_msg(&self) -> bool {
        self.severity() == Some(Severity::Error)
    }

    /// First message with the given code
    pub fn message_by_code(&self, code: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.code == code)
    }

    /// All messages with the given code
    pub fn messages_by_code(&self, code: &str) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.code == code).collect()
    }

    /// All messages referencing the given object
    pub fn messages_for(&self, object: &str) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.refers_to(object)).collect()
    }

    /// Drop messages whose code is disabled and rewrite severities from configured overrides
    pub fn apply_overrides(&mut self, disabled: &[String], severities: &HashMap<String, Severity>) {
        self.messages
            .retain(|m| !disabled.iter().any(|code| code == &m.code));
        for message in &mut self.messages {
            if let Some(severity) = severities.get(&message.code) {
                message.severity = *severity;
            }
        }
    }

    /// Sort by severity (errors first), keeping the original order within a severity
    pub fn sort_by_severity(&mut self) {
        self.messages.sort_by(|a, b| b.severity.cmp(&a.severity));
    }

    pub fn into_vec(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Vec<Message>> for MessageList {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl IntoIterator for MessageList {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a MessageList {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl Extend<Message> for MessageList {
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        self.messages.extend(iter);
    }
}
