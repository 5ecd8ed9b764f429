use tracing::info;
use uuid::Uuid;

use foreman_core::{Message, StepRecord};
use foreman_llm::{ChatMessage, ChatRole};

/// The ordered message buffer for one run.
///
/// Owned and mutated by exactly one supervisor instance. Reconstructed on
/// resume from two persisted streams: chat messages and completed tool
/// outputs.
pub struct Conversation {
    messages: Vec<Message>,
    max_context_tokens: usize,
}

impl Conversation {
    pub fn new(max_context_tokens: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_context_tokens,
        }
    }

    /// Rebuild the conversation by merging the chat stream with the
    /// completed-step stream. Both inputs are ordered by creation time;
    /// on a timestamp tie the chat message comes first.
    pub fn load(
        chat: Vec<Message>,
        completed_steps: &[StepRecord],
        max_context_tokens: usize,
    ) -> Self {
        let tool_outputs: Vec<Message> = completed_steps.iter().map(step_to_message).collect();

        let mut messages = Vec::with_capacity(chat.len() + tool_outputs.len());
        let mut chat_iter = chat.into_iter().peekable();
        let mut tool_iter = tool_outputs.into_iter().peekable();

        loop {
            match (chat_iter.peek(), tool_iter.peek()) {
                (Some(m), Some(t)) => {
                    if m.created_at <= t.created_at {
                        messages.push(chat_iter.next().unwrap());
                    } else {
                        messages.push(tool_iter.next().unwrap());
                    }
                }
                (Some(_), None) => messages.push(chat_iter.next().unwrap()),
                (None, Some(_)) => messages.push(tool_iter.next().unwrap()),
                (None, None) => break,
            }
        }

        Self {
            messages,
            max_context_tokens,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Sum of per-message token estimates.
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.estimate_tokens()).sum()
    }

    /// If the token estimate exceeds the budget, keep only the trailing
    /// half of the message list. Returns whether trimming happened.
    pub fn trim(&mut self) -> bool {
        if self.estimated_tokens() <= self.max_context_tokens {
            return false;
        }
        let n = self.messages.len();
        let keep = n / 2;
        self.messages.drain(0..n - keep);
        info!(
            dropped = n - keep,
            kept = keep,
            "conversation over context budget, trimmed to trailing half"
        );
        true
    }

    /// Convert to the provider-neutral message format.
    pub fn to_chat(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    foreman_core::Role::User => ChatRole::User,
                    foreman_core::Role::Assistant => ChatRole::Assistant,
                    foreman_core::Role::Tool => ChatRole::Tool,
                },
                content: m.content.clone(),
            })
            .collect()
    }
}

fn step_to_message(step: &StepRecord) -> Message {
    let content = step
        .tool_output
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_default();
    Message {
        id: Uuid::new_v4(),
        run_id: step.run_id,
        role: foreman_core::Role::Tool,
        content,
        tool_call_id: Some(step.id.to_string()),
        tool_name: Some(step.tool_name.clone()),
        created_at: step.created_at,
    }
}
