//! Interactive chat loop.

use anyhow::Result;
use docchat_chat::{ChatMode, ChatOrchestrator, Role, new_conversation_id};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::error;

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Message(String),
    SwitchMode(ChatMode),
    Clear,
    History,
    Quit,
    Empty,
    Invalid(String),
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("quit" | "exit" | "q"), _) => Self::Quit,
            (Some("clear"), _) => Self::Clear,
            (Some("history"), _) => Self::History,
            (Some("mode"), Some(mode)) => match mode.parse() {
                Ok(mode) => Self::SwitchMode(mode),
                Err(e) => Self::Invalid(e),
            },
            (Some("mode"), None) => Self::Invalid("usage: /mode general|document".to_string()),
            _ => Self::Invalid(format!(
                "unknown command '{line}' (try /mode, /clear, /history, /quit)"
            )),
        }
    }
}

/// Read questions until `/quit`, Ctrl-C or Ctrl-D.
pub async fn run(orchestrator: &ChatOrchestrator, mut mode: ChatMode) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let conversation_id = new_conversation_id();
    println!("docchat ({mode} mode). Commands: /mode general|document, /clear, /history, /quit");

    loop {
        let line = match rl.readline(&format!("{mode}> ")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match ReplInput::parse(&line) {
            ReplInput::Empty => continue,
            ReplInput::Quit => break,
            ReplInput::Invalid(message) => println!("{message}"),
            ReplInput::SwitchMode(next) => {
                if next == ChatMode::Document && !orchestrator.has_retriever() {
                    println!("Document mode is not available");
                    continue;
                }
                mode = next;
                println!("Switched to {mode} mode");
            }
            ReplInput::Clear => {
                orchestrator.clear_conversation(&conversation_id).await;
                println!("Conversation cleared");
            }
            ReplInput::History => {
                for turn in orchestrator.history(&conversation_id).await {
                    let who = match turn.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                    };
                    println!("[{}] {who}: {}", turn.timestamp.format("%H:%M:%S"), turn.content);
                }
            }
            ReplInput::Message(message) => {
                let _ = rl.add_history_entry(message.as_str());
                match orchestrator.respond(&message, mode, Some(conversation_id.clone())).await {
                    Ok(reply) => {
                        println!("{}", reply.response);
                        if !reply.metadata.sources.is_empty() {
                            println!("  sources: {}", reply.metadata.sources.join(", "));
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "chat failed");
                        println!("{e}");
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_messages() {
        assert_eq!(
            ReplInput::parse("  what is this?  "),
            ReplInput::Message("what is this?".into())
        );
        assert_eq!(ReplInput::parse("   "), ReplInput::Empty);
    }

    #[test]
    fn slash_commands_are_recognised() {
        assert_eq!(ReplInput::parse("/quit"), ReplInput::Quit);
        assert_eq!(ReplInput::parse("/exit"), ReplInput::Quit);
        assert_eq!(ReplInput::parse("/clear"), ReplInput::Clear);
        assert_eq!(ReplInput::parse("/history"), ReplInput::History);
        assert_eq!(ReplInput::parse("/mode document"), ReplInput::SwitchMode(ChatMode::Document));
        assert_eq!(ReplInput::parse("/mode general"), ReplInput::SwitchMode(ChatMode::General));
    }

    #[test]
    fn bad_commands_explain_themselves() {
        assert!(matches!(ReplInput::parse("/mode"), ReplInput::Invalid(_)));
        assert!(matches!(ReplInput::parse("/mode sideways"), ReplInput::Invalid(_)));
        assert!(matches!(
            ReplInput::parse("/dance"),
            ReplInput::Invalid(m) if m.contains("/dance")
        ));
    }
}
