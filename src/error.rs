use thiserror::Error;

use crate::prompts::{EMPTY_REPLY_FALLBACK, TRANSPORT_FAILURE_FALLBACK};

/// Ways a completion request can fail to produce reply text.
///
/// None of these are fatal: the controller turns them into an assistant
/// message via [`ReplyError::fallback_text`].
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("completion returned no usable reply text")]
    EmptyReply,

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no API key configured (set `api_key` in config.toml or the {env} environment variable)")]
    MissingApiKey { env: String },
}

impl ReplyError {
    /// True when the call went through but nothing usable came back
    pub fn is_empty_reply(&self) -> bool {
        matches!(self, ReplyError::EmptyReply)
    }

    /// Fixed text shown in the transcript in place of a reply
    pub fn fallback_text(&self) -> &'static str {
        if self.is_empty_reply() {
            EMPTY_REPLY_FALLBACK
        } else {
            TRANSPORT_FAILURE_FALLBACK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reply_uses_its_own_fallback() {
        assert_eq!(ReplyError::EmptyReply.fallback_text(), EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn every_other_failure_reads_as_transport_failure() {
        let decode = ReplyError::from(serde_json::from_str::<serde_json::Value>("<html>").unwrap_err());
        let missing = ReplyError::MissingApiKey {
            env: "OPENAI_API_KEY".to_string(),
        };

        assert_eq!(decode.fallback_text(), TRANSPORT_FAILURE_FALLBACK);
        assert_eq!(missing.fallback_text(), TRANSPORT_FAILURE_FALLBACK);
        assert_ne!(EMPTY_REPLY_FALLBACK, TRANSPORT_FAILURE_FALLBACK);
    }

    #[test]
    fn missing_key_names_the_variable() {
        let err = ReplyError::MissingApiKey {
            env: "MY_KEY".to_string(),
        };
        assert!(err.to_string().contains("MY_KEY"));
    }
}
