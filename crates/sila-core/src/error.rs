//! Failure taxonomy for text-generation requests.
//!
//! Every failure inside a send is converted into exactly one assistant
//! message; nothing here is ever propagated far enough to crash the client.

use crate::config::Language;

/// Stable codes for each failure class. These show up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Network,
    Protocol,
    Unknown,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Protocol => "PROTOCOL_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The access credential is not configured.
    #[error("API key is not configured")]
    Configuration,

    /// Transport failure (`status` is `None`) or a non-2xx reply.
    #[error("network error{}: {detail}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
    Network { status: Option<u16>, detail: String },

    /// The transport succeeded but the body is not a generation envelope.
    #[error("unexpected response: {detail}")]
    Protocol { detail: String },

    #[error("unknown error: {}", .0.as_deref().unwrap_or("no description"))]
    Unknown(Option<String>),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Configuration => ErrorKind::Configuration,
            GenerationError::Network { .. } => ErrorKind::Network,
            GenerationError::Protocol { .. } => ErrorKind::Protocol,
            GenerationError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Human-readable explanation appended to the transcript in place of a
    /// reply. Deterministic for a given error and language.
    pub fn user_message(&self, language: Language) -> String {
        let detail = self.detail(language);
        match language {
            Language::Arabic => format!(
                "عذراً، حدث خطأ في الاتصال: {detail}. يرجى التحقق من API key والمحاولة مرة أخرى."
            ),
            Language::English => format!(
                "Sorry, a connection error occurred: {detail}. Please check your API key and try again."
            ),
        }
    }

    fn detail(&self, language: Language) -> String {
        match self {
            GenerationError::Configuration => match language {
                Language::Arabic => "API key غير موجود".to_string(),
                Language::English => "API key is missing".to_string(),
            },
            GenerationError::Network {
                status: Some(status),
                detail,
            } => format!("API Error: {status} - {detail}"),
            GenerationError::Network {
                status: None,
                detail,
            } => detail.clone(),
            GenerationError::Protocol { detail } if !detail.is_empty() => detail.clone(),
            GenerationError::Protocol { .. } => match language {
                Language::Arabic => "تنسيق استجابة غير متوقع من API".to_string(),
                Language::English => "unexpected response format from API".to_string(),
            },
            GenerationError::Unknown(Some(description)) if !description.trim().is_empty() => {
                description.clone()
            }
            GenerationError::Unknown(_) => match language {
                Language::Arabic => "خطأ غير معروف".to_string(),
                Language::English => "unknown error".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_message_embeds_status_and_detail() {
        let err = GenerationError::Network {
            status: Some(500),
            detail: "quota exceeded".to_string(),
        };
        let text = err.user_message(Language::Arabic);
        assert!(text.contains("500"));
        assert!(text.contains("quota exceeded"));
        assert!(text.starts_with("عذراً"));
        assert_eq!(err.kind().code(), "NETWORK_ERROR");
    }

    #[test]
    fn test_unknown_without_description_uses_generic_phrase() {
        let err = GenerationError::Unknown(None);
        assert!(err.user_message(Language::Arabic).contains("خطأ غير معروف"));
        assert!(err.user_message(Language::English).contains("unknown error"));

        let blank = GenerationError::Unknown(Some("  ".to_string()));
        assert_eq!(blank.user_message(Language::English), err.user_message(Language::English));
    }

    #[test]
    fn test_protocol_default_detail() {
        let err = GenerationError::Protocol {
            detail: String::new(),
        };
        assert!(err.user_message(Language::Arabic).contains("تنسيق استجابة غير متوقع"));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_configuration_message_is_deterministic() {
        let a = GenerationError::Configuration.user_message(Language::English);
        let b = GenerationError::Configuration.user_message(Language::English);
        assert_eq!(a, b);
        assert!(a.contains("API key is missing"));
    }
}
