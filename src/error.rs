use std::time::Duration;

/// Errors a command handler can surface to the user.
///
/// Every variant maps to exactly one user-visible reply; `Internal` is the
/// catch-all for unexpected failures and always renders as the same generic
/// message so internals never leak into the chat.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(String),
    #[error("permission denied")]
    Permission,
    #[error("cooldown active ({0:?} remaining)")]
    CooldownActive(Duration),
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: i64, need: i64 },
    #[error("invalid stake")]
    InvalidStake,
    #[error("cannot transfer to yourself")]
    SelfTransfer,
    #[error("target is a group admin")]
    NotGroupAdmin,
    #[error("collaborator failure: {0}")]
    Collaborator(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// The reply text shown in chat for this error.
    pub fn reply_text(&self) -> String {
        match self {
            CommandError::Usage(hint) => format!("Usage: {}", hint),
            CommandError::Permission => "You don't have permission to use this command.".into(),
            CommandError::CooldownActive(remaining) => {
                format!("Slow down! Try again in {}.", format_remaining(*remaining))
            }
            CommandError::InsufficientFunds { have, .. } => {
                format!("Insufficient funds! You have ${}.", have)
            }
            CommandError::InvalidStake => "Please enter a valid amount greater than zero.".into(),
            CommandError::SelfTransfer => "You cannot transfer funds to yourself.".into(),
            CommandError::NotGroupAdmin => "Cannot do that: the target is a group admin.".into(),
            CommandError::Collaborator(_) | CommandError::Internal(_) => {
                "Command failed, please try again later.".into()
            }
        }
    }

    /// Whether this error was unexpected (counts towards the failure metric).
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            CommandError::Collaborator(_) | CommandError::Internal(_)
        )
    }
}

impl From<crate::transport::TransportError> for CommandError {
    fn from(e: crate::transport::TransportError) -> Self {
        CommandError::Collaborator(e.to_string())
    }
}

/// Render a remaining-time duration the way cooldown replies expect it.
pub fn format_remaining(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs.max(1))
    }
}
