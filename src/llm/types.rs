//! Message types for LLM communication.
//!
//! Defines the chat-completion message shapes, including the legacy
//! function-calling fields (`function_call` on assistant messages and the
//! `function` role carrying results).

use serde::{Deserialize, Serialize};

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call.
    pub name: String,
    /// JSON-encoded arguments, as produced by the model.
    #[serde(default)]
    pub arguments: String,
}

/// Whether the model may call functions on this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionCallMode {
    /// The model decides.
    Auto,
    /// The model must answer in text.
    None,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    FunctionCall,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Parses the `finish_reason` field of a completion choice.
    pub fn parse(s: &str) -> Self {
        match s {
            "stop" => Self::Stop,
            "function_call" => Self::FunctionCall,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Response from an LLM that may include a function call.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// Text content (empty when the model only called a function).
    pub content: String,
    /// Function call requested by the model.
    pub function_call: Option<FunctionCall>,
    /// Reported finish reason.
    pub finish_reason: FinishReason,
}

impl LlmResponse {
    /// Creates a plain text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            function_call: None,
            finish_reason: FinishReason::Stop,
        }
    }

    /// Creates a response requesting a function call.
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
            finish_reason: FinishReason::FunctionCall,
        }
    }

    /// Returns true if the model stopped to call a function.
    pub fn requests_function(&self) -> bool {
        self.finish_reason == FinishReason::FunctionCall
    }
}

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing context and instructions.
    System,
    /// User message (human input).
    User,
    /// Assistant message (LLM response).
    Assistant,
    /// Result of a function the model asked for.
    Function,
}

impl Role {
    /// Returns the role as a string for API requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// Text content; `null` on assistant messages that only call a function.
    pub content: Option<String>,
    /// Function name, set on `function` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function call made by the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    /// Creates a new text message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates the assistant message recording a function call.
    pub fn assistant_function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            name: None,
            function_call: Some(call),
        }
    }

    /// Creates a function result message.
    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            content: Some(content.into()),
            name: Some(name.into()),
            function_call: None,
        }
    }

    /// Returns the text content, or an empty string.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Returns true for assistant messages that only record a function call.
    pub fn is_function_call(&self) -> bool {
        self.function_call.is_some()
    }
}

/// A conversation consisting of multiple messages.
///
/// Holds the whole session history; the system prompt, once inserted,
/// stays at index 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates a new empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message to the conversation.
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Adds a user message to the conversation.
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.add(Message::user(content));
    }

    /// Adds an assistant message to the conversation.
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.add(Message::assistant(content));
    }

    /// Returns true if any message has the system role.
    pub fn has_system(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::System)
    }

    /// Inserts a system message at the top of the conversation.
    pub fn insert_system(&mut self, content: impl Into<String>) {
        self.messages.insert(0, Message::system(content));
    }

    /// Returns all messages in the conversation.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Clears all messages from the conversation.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the number of messages in the conversation.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
