//! Ordered chat history shared with the delegate.

use tif_llm::{ChatMessage, Role, ToolCall};

/// The agent's conversation.
///
/// Holds exactly one system turn, added at construction. Turns are only ever
/// appended.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Assistant turn that requested `call`. Must be followed by
    /// [`Conversation::push_tool_result`] for the same call.
    pub fn push_tool_request(&mut self, content: impl Into<String>, call: ToolCall) {
        self.messages
            .push(ChatMessage::assistant_with_tool_call(content, call));
    }

    pub fn push_tool_result(&mut self, call: &ToolCall, content: impl Into<String>) {
        self.messages.push(ChatMessage::tool_result(call, content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of turns with the given role.
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_single_system_turn() {
        let conversation = Conversation::new("You answer TIF questions.");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::System);
        assert_eq!(conversation.count_role(Role::System), 1);
    }

    #[test]
    fn test_tool_turns_carry_call_identity() {
        let call = ToolCall {
            id: "call_7".to_string(),
            name: "get_schema_info".to_string(),
            arguments: "{}".to_string(),
        };

        let mut conversation = Conversation::new("system");
        conversation.push_user("What columns exist?");
        conversation.push_tool_request("", call.clone());
        conversation.push_tool_result(&call, "Table: expenditures");

        let request = &conversation.messages()[2];
        assert_eq!(request.tool_calls, vec![call]);

        let result = conversation.last().unwrap();
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(result.name.as_deref(), Some("get_schema_info"));
    }
}
