//! Append-only chat history. The first turn is always the system context;
//! after that turns only ever get pushed, in call order.

use crate::completion::{timed_complete, ChatMessage, CompletionRequest, CompletionService, Role};
use crate::ExitIntelError;

#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(context_prompt: String) -> Self {
        Self {
            turns: vec![ChatMessage::system(context_prompt)],
        }
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when the last user turn has no assistant reply, i.e. the
    /// previous completion failed.
    pub fn awaiting_reply(&self) -> bool {
        self.turns.last().is_some_and(|t| t.role == Role::User)
    }

    /// Append `input` as a user turn and ask for a reply over the full history.
    ///
    /// On failure the user turn stays recorded and nothing else is
    /// appended; call [`Conversation::retry`] to resend.
    pub fn converse(
        &mut self,
        service: &dyn CompletionService,
        model: &str,
        input: &str,
    ) -> Result<String, ExitIntelError> {
        self.turns.push(ChatMessage::user(input));
        self.request_reply(service, model)
    }

    /// Resend the unchanged history after a failed `converse`.
    pub fn retry(
        &mut self,
        service: &dyn CompletionService,
        model: &str,
    ) -> Result<String, ExitIntelError> {
        if !self.awaiting_reply() {
            return Err(ExitIntelError::Conversation("no unanswered question to retry".into()));
        }
        self.request_reply(service, model)
    }

    fn request_reply(
        &mut self,
        service: &dyn CompletionService,
        model: &str,
    ) -> Result<String, ExitIntelError> {
        let request = CompletionRequest {
            model,
            messages: &self.turns,
            json_mode: false,
        };
        let reply = timed_complete(service, "chat", &request)
            .map_err(|e| ExitIntelError::Conversation(e.to_string()))?;
        self.turns.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }
}
