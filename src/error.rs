use thiserror::Error;

pub const REJECTED_FALLBACK: &str = "Credenciales inválidas";
pub const TRANSPORT_FALLBACK: &str = "No se pudo conectar con el servidor";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The remote answered but did not produce a usable identity.
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Transport(String),
    /// Stored session could not be parsed. Handled by a silent logout.
    #[error("stored session is corrupt: {0}")]
    RestorationCorrupt(String),
}

impl AuthError {
    pub fn rejected(message: Option<String>) -> Self {
        AuthError::Rejected(non_blank(message).unwrap_or_else(|| REJECTED_FALLBACK.to_string()))
    }

    pub fn transport(message: Option<String>) -> Self {
        AuthError::Transport(non_blank(message).unwrap_or_else(|| TRANSPORT_FALLBACK.to_string()))
    }
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}
