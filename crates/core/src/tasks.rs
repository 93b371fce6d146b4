//! The declarative task-variant table. Each bot capability is one row
//! selecting a system prompt, a model id, and a response post-processing
//! rule; adding a capability is adding a row plus a trigger binding in the
//! Slack layer, never a new relay code path.

const POLISH_PROMPT: &str = "You are a professional editor. Your task is to polish and optimize \
     the given message to make it more professional, clear, and effective while maintaining its \
     original meaning. Keep the tone gentle and professional.";

const CHAT_PROMPT: &str = "You are a helpful assistant. Format your responses using \
     Slack-compatible markdown when appropriate:\n\
     - Use *bold* for emphasis\n\
     - Use `code` for code snippets or technical terms\n\
     - Use ```language\ncode block``` for multi-line code\n\
     - Use > for quotes\n\
     - Use \u{2022} or - for bullet points\n\
     Be concise but thorough in your responses.";

const MENTION_PROMPT: &str = "You are a helpful assistant answering questions in a busy Slack \
     channel. Answer directly and briefly, using Slack-compatible markdown. If a question is \
     ambiguous, state your assumption in one line and answer anyway.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskName {
    Polish,
    Chat,
    Mention,
}

impl TaskName {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Polish => "polish",
            Self::Chat => "chat",
            Self::Mention => "mention",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostProcess {
    None,
    /// Rewrite double-asterisk emphasis into Slack's single-asterisk
    /// convention. Idempotent; fenced code blocks are left untouched.
    SlackEmphasis,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskVariant {
    pub name: TaskName,
    pub system_prompt: &'static str,
    pub model: String,
    pub post_process: PostProcess,
}

impl TaskVariant {
    pub fn apply_post_process(&self, text: &str) -> String {
        match self.post_process {
            PostProcess::None => text.to_owned(),
            PostProcess::SlackEmphasis => normalize_emphasis(text),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TaskRegistry {
    variants: Vec<TaskVariant>,
}

impl TaskRegistry {
    pub fn new(default_model: impl Into<String>) -> Self {
        let model = default_model.into();
        Self {
            variants: vec![
                TaskVariant {
                    name: TaskName::Polish,
                    system_prompt: POLISH_PROMPT,
                    model: model.clone(),
                    post_process: PostProcess::None,
                },
                TaskVariant {
                    name: TaskName::Chat,
                    system_prompt: CHAT_PROMPT,
                    model: model.clone(),
                    post_process: PostProcess::SlackEmphasis,
                },
                TaskVariant {
                    name: TaskName::Mention,
                    system_prompt: MENTION_PROMPT,
                    model,
                    post_process: PostProcess::SlackEmphasis,
                },
            ],
        }
    }

    pub fn get(&self, name: TaskName) -> &TaskVariant {
        self.variants
            .iter()
            .find(|variant| variant.name == name)
            .unwrap_or(&self.variants[0])
    }
}

/// Collapses runs of two or more `*` into a single `*` so that generated
/// `**bold**` renders as Slack bold. Content inside triple-backtick fences
/// passes through unchanged. Re-applying to normalized text is a no-op.
pub fn normalize_emphasis(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut in_fence = false;

    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            output.push_str(line);
            continue;
        }

        if in_fence {
            output.push_str(line);
            continue;
        }

        let mut run = 0usize;
        for ch in line.chars() {
            if ch == '*' {
                run += 1;
                continue;
            }
            if run > 0 {
                output.push('*');
                run = 0;
            }
            output.push(ch);
        }
        if run > 0 {
            output.push('*');
        }
    }

    output
}
