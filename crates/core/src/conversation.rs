use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message unit. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Ordered turn sequence for one user. Stored conversations never contain
/// system turns; the task prompt is inserted at call time only.
pub type Conversation = Vec<Turn>;

/// Checks the stored-history invariant: turns strictly alternate
/// user/assistant, starting with a user turn.
pub fn is_well_formed(turns: &[Turn]) -> bool {
    turns.iter().enumerate().all(|(index, turn)| {
        let expected = if index % 2 == 0 { Role::User } else { Role::Assistant };
        turn.role == expected
    })
}

#[cfg(test)]
mod tests {
    use super::{is_well_formed, Turn};

    #[test]
    fn empty_history_is_well_formed() {
        assert!(is_well_formed(&[]));
    }

    #[test]
    fn alternating_user_assistant_pairs_are_well_formed() {
        let turns = vec![
            Turn::user("hello"),
            Turn::assistant("hi"),
            Turn::user("and you?"),
            Turn::assistant("fine"),
        ];
        assert!(is_well_formed(&turns));
    }

    #[test]
    fn history_starting_with_assistant_is_rejected() {
        assert!(!is_well_formed(&[Turn::assistant("hi")]));
    }

    #[test]
    fn stored_system_turns_are_rejected() {
        assert!(!is_well_formed(&[Turn::system("prompt"), Turn::user("hello")]));
    }

    #[test]
    fn doubled_user_turns_are_rejected() {
        assert!(!is_well_formed(&[Turn::user("one"), Turn::user("two")]));
    }
}
