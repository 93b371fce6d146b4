use thiserror::Error;

/// A slash-command trigger as delivered over Socket Mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    /// `/polish <draft>` - one-shot rewrite of a draft message.
    Polish { draft: String },
    /// `/gpt <message>` - conversational exchange with stored history.
    Chat { message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

pub fn parse_command(payload: &SlashCommandPayload) -> Result<BotCommand, CommandParseError> {
    let text = payload.text.trim().to_owned();
    match payload.command.as_str() {
        "/polish" => Ok(BotCommand::Polish { draft: text }),
        "/gpt" => Ok(BotCommand::Chat { message: text }),
        other => Err(CommandParseError::UnsupportedCommand(other.to_owned())),
    }
}

impl BotCommand {
    pub fn text(&self) -> &str {
        match self {
            Self::Polish { draft } => draft,
            Self::Chat { message } => message,
        }
    }

    /// Ephemeral hint shown when the command arrives without text.
    pub fn usage_hint(&self) -> &'static str {
        match self {
            Self::Polish { .. } => "Please provide a message to polish. Usage: `/polish <message>`",
            Self::Chat { .. } => "Please provide a message with the /gpt command",
        }
    }
}

/// Strips `<@...>` mention tokens so a channel mention becomes a plain
/// question for the relay.
pub fn strip_mentions(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '<' && matches!(chars.peek(), Some('@')) {
            for next in chars.by_ref() {
                if next == '>' {
                    break;
                }
            }
            continue;
        }
        output.push(ch);
    }

    output.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::{parse_command, strip_mentions, BotCommand, CommandParseError, SlashCommandPayload};

    fn payload(command: &str, text: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            command: command.to_owned(),
            text: text.to_owned(),
            user_id: "U1".to_owned(),
            channel_id: "C1".to_owned(),
            trigger_id: "trigger-1".to_owned(),
        }
    }

    #[test]
    fn polish_and_gpt_commands_are_recognized() {
        assert_eq!(
            parse_command(&payload("/polish", "  my draft ")),
            Ok(BotCommand::Polish { draft: "my draft".to_owned() })
        );
        assert_eq!(
            parse_command(&payload("/gpt", "hello")),
            Ok(BotCommand::Chat { message: "hello".to_owned() })
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            parse_command(&payload("/quote", "status")),
            Err(CommandParseError::UnsupportedCommand("/quote".to_owned()))
        );
    }

    #[test]
    fn empty_text_parses_and_carries_a_usage_hint() {
        let command = parse_command(&payload("/polish", "   ")).expect("parse");
        assert!(command.text().is_empty());
        assert!(command.usage_hint().contains("/polish"));
    }

    #[test]
    fn mention_tokens_are_stripped_wherever_they_appear() {
        assert_eq!(strip_mentions("<@U0BOT> what is rust?"), "what is rust?");
        assert_eq!(strip_mentions("hey <@U0BOT>, what is rust?"), "hey , what is rust?");
        assert_eq!(strip_mentions("<@U0BOT>"), "");
    }

    #[test]
    fn text_without_mentions_is_unchanged() {
        assert_eq!(strip_mentions("plain question"), "plain question");
    }
}
