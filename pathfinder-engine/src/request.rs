//! Path request identity.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::error::{PathfinderError, Result};

/// A (source, target) pair to discover paths between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PathRequest {
    pub source_user_id: String,
    pub target_user_id: String,
}

impl PathRequest {
    /// Build a validated request.
    pub fn new(source_user_id: impl Into<String>, target_user_id: impl Into<String>) -> Result<Self> {
        let request = Self {
            source_user_id: source_user_id.into(),
            target_user_id: target_user_id.into(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Reject empty identifiers and self-paths.
    pub fn validate(&self) -> Result<()> {
        if self.source_user_id.trim().is_empty() {
            return Err(PathfinderError::Validation("source user id is empty".into()));
        }
        if self.target_user_id.trim().is_empty() {
            return Err(PathfinderError::Validation("target user id is empty".into()));
        }
        if self.source_user_id == self.target_user_id {
            return Err(PathfinderError::Validation(format!(
                "source and target are the same person: {}",
                self.source_user_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request() {
        let request = PathRequest::new("1", "2").unwrap();
        assert_eq!(request.source_user_id, "1");
        assert_eq!(request.target_user_id, "2");
    }

    #[test]
    fn test_self_path_rejected() {
        let err = PathRequest::new("1", "1").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_empty_ids_rejected() {
        assert!(PathRequest::new("", "2").unwrap_err().is_validation());
        assert!(PathRequest::new("1", "  ").unwrap_err().is_validation());
    }

    #[test]
    fn test_hand_built_request_validates() {
        let request = PathRequest {
            source_user_id: "x".into(),
            target_user_id: "x".into(),
        };
        assert!(request.validate().is_err());
    }
}
