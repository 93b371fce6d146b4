//! Block Kit builders. The serde representations match Slack's wire JSON so
//! views and messages can be posted directly to the Web API.

use serde::Serialize;

use gloss_core::{Role, Turn};

pub const REGENERATE_ACTION_ID: &str = "polish.regenerate.v1";
pub const CHAT_MODAL_CALLBACK_ID: &str = "chat.modal.v1";
pub const POLISH_RESULT_CALLBACK_ID: &str = "polish.result.v1";
pub const LOADING_CALLBACK_ID: &str = "gloss.loading.v1";

pub const CHAT_INPUT_BLOCK_ID: &str = "message_input";
pub const CHAT_INPUT_ACTION_ID: &str = "message";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    Button {
        action_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl ActionElement {
    pub fn button(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Button { action_id: action_id.into(), text: TextObject::plain(label), value: None }
    }

    pub fn value(self, value: impl Into<String>) -> Self {
        match self {
            Self::Button { action_id, text, .. } => {
                Self::Button { action_id, text, value: Some(value.into()) }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    PlainTextInput {
        action_id: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: TextObject,
    },
    Divider,
    Context {
        elements: Vec<TextObject>,
    },
    Actions {
        block_id: String,
        elements: Vec<ActionElement>,
    },
    Input {
        block_id: String,
        element: InputElement,
        label: TextObject,
    },
}

/// A modal view in Slack's `views.open`/`views.update` shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    view_type: &'static str,
    pub callback_id: String,
    pub title: TextObject,
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_metadata: Option<String>,
}

impl ModalView {
    pub fn new(callback_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            view_type: "modal",
            callback_id: callback_id.into(),
            title: TextObject::plain(title),
            blocks: Vec::new(),
            submit: None,
            close: None,
            private_metadata: None,
        }
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn submit(mut self, label: impl Into<String>) -> Self {
        self.submit = Some(TextObject::plain(label));
        self
    }

    pub fn close(mut self, label: impl Into<String>) -> Self {
        self.close = Some(TextObject::plain(label));
        self
    }

    pub fn private_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.private_metadata = Some(metadata.into());
        self
    }
}

/// A channel message: fallback text plus blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub fn loading_view(title: &str, status_line: &str) -> ModalView {
    ModalView::new(LOADING_CALLBACK_ID, title)
        .block(Block::Section { text: TextObject::mrkdwn(status_line) })
}

pub fn polish_loading_view() -> ModalView {
    loading_view(
        "Polishing Message...",
        "\u{2728} *AI is polishing your message...* \u{2728}\n\nThis will just take a moment.",
    )
}

pub fn chat_loading_view() -> ModalView {
    loading_view("Chat with GPT", "\u{2728} *GPT is thinking...* \u{2728}")
}

pub fn polish_result_view(original: &str, polished: &str) -> ModalView {
    ModalView::new(POLISH_RESULT_CALLBACK_ID, "Polished Message")
        .close("Close")
        .block(Block::Section {
            text: TextObject::mrkdwn(format!("*Original Message:*\n{original}")),
        })
        .block(Block::Section {
            text: TextObject::mrkdwn("\u{2728} *Your polished message is ready:* \u{2728}"),
        })
        .block(Block::Section { text: TextObject::plain(polished) })
        .block(Block::Context {
            elements: vec![TextObject::mrkdwn(
                "\u{1f446} *Tip:* Select the text above and use Cmd/Ctrl+C to copy",
            )],
        })
        .block(Block::Actions {
            block_id: "message_actions".to_owned(),
            elements: vec![ActionElement::button(REGENERATE_ACTION_ID, "Regenerate")
                .value(original)],
        })
}

/// Renders the whole transcript plus an input for the next message, so a
/// modal submission re-enters the relay with the conversation intact.
pub fn chat_view(conversation: &[Turn]) -> ModalView {
    let mut view = ModalView::new(CHAT_MODAL_CALLBACK_ID, "Chat with GPT")
        .submit("Send")
        .close("Close");

    for turn in conversation {
        let speaker = match turn.role {
            Role::User => "*You:*",
            Role::Assistant => "*GPT:*",
            Role::System => continue,
        };
        view = view
            .block(Block::Section {
                text: TextObject::mrkdwn(format!("{speaker}\n{}", turn.content)),
            })
            .block(Block::Divider);
    }

    view.block(Block::Input {
        block_id: CHAT_INPUT_BLOCK_ID.to_owned(),
        element: InputElement::PlainTextInput {
            action_id: CHAT_INPUT_ACTION_ID.to_owned(),
            multiline: true,
            placeholder: Some(TextObject::plain("Continue the conversation...")),
        },
        label: TextObject::plain("Your message"),
    })
}

pub fn error_view(apology: &str) -> ModalView {
    ModalView::new(LOADING_CALLBACK_ID, "Error")
        .close("Close")
        .block(Block::Section { text: TextObject::mrkdwn(apology) })
}

/// Failure view for the polish flow. Keeps the original draft on screen and
/// re-offers the Regenerate button carrying it, so a failed attempt never
/// forces the user to retype.
pub fn polish_error_view(original: &str, apology: &str) -> ModalView {
    ModalView::new(POLISH_RESULT_CALLBACK_ID, "Polished Message")
        .close("Close")
        .block(Block::Section { text: TextObject::mrkdwn(apology) })
        .block(Block::Section {
            text: TextObject::mrkdwn(format!("*Original Message:*\n{original}")),
        })
        .block(Block::Actions {
            block_id: "message_actions".to_owned(),
            elements: vec![ActionElement::button(REGENERATE_ACTION_ID, "Regenerate")
                .value(original)],
        })
}

pub fn mention_reply(user_id: &str, answer: &str) -> MessageTemplate {
    MessageTemplate {
        fallback_text: answer.to_owned(),
        blocks: vec![Block::Section {
            text: TextObject::mrkdwn(format!("<@{user_id}> {answer}")),
        }],
    }
}

#[cfg(test)]
mod tests {
    use gloss_core::Turn;
    use serde_json::json;

    use super::{chat_view, polish_error_view, polish_result_view, ActionElement, Block, TextObject};

    #[test]
    fn section_serializes_to_slack_wire_shape() {
        let block = Block::Section { text: TextObject::mrkdwn("*hi*") };
        let value = serde_json::to_value(&block).expect("serialize");
        assert_eq!(value, json!({"type": "section", "text": {"type": "mrkdwn", "text": "*hi*"}}));
    }

    #[test]
    fn button_serializes_with_type_tag() {
        let element = ActionElement::button("polish.regenerate.v1", "Regenerate").value("draft");
        let value = serde_json::to_value(&element).expect("serialize");
        assert_eq!(value["type"], "button");
        assert_eq!(value["action_id"], "polish.regenerate.v1");
        assert_eq!(value["value"], "draft");
        assert_eq!(value["text"]["type"], "plain_text");
    }

    #[test]
    fn polish_result_carries_original_in_regenerate_value() {
        let view = polish_result_view("my draft", "My polished draft.");
        let value = serde_json::to_value(&view).expect("serialize");
        let actions = value["blocks"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|block| block["type"] == "actions"))
            .expect("actions block");
        assert_eq!(actions["elements"][0]["value"], "my draft");
    }

    #[test]
    fn chat_view_interleaves_transcript_and_keeps_input_last() {
        let view = chat_view(&[Turn::user("hello"), Turn::assistant("Hi there.")]);
        let value = serde_json::to_value(&view).expect("serialize");
        let blocks = value["blocks"].as_array().expect("blocks");

        assert_eq!(blocks[0]["type"], "section");
        assert!(blocks[0]["text"]["text"].as_str().expect("text").starts_with("*You:*"));
        assert_eq!(blocks[1]["type"], "divider");
        assert!(blocks[2]["text"]["text"].as_str().expect("text").starts_with("*GPT:*"));
        assert_eq!(blocks.last().expect("input")["type"], "input");
        assert_eq!(value["submit"]["text"], "Send");
    }

    #[test]
    fn polish_error_keeps_draft_and_regenerate_button() {
        let view = polish_error_view("my draft", "Sorry, something broke.");
        let value = serde_json::to_value(&view).expect("serialize");
        let body = value.to_string();
        assert!(body.contains("my draft"));

        let actions = value["blocks"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|block| block["type"] == "actions"))
            .expect("actions block");
        assert_eq!(actions["elements"][0]["action_id"], "polish.regenerate.v1");
        assert_eq!(actions["elements"][0]["value"], "my draft");
    }

    #[test]
    fn modal_type_tag_is_always_modal() {
        let value = serde_json::to_value(polish_result_view("a", "b")).expect("serialize");
        assert_eq!(value["type"], "modal");
    }
}
