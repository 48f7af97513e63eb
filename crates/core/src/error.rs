use crate::types::BatchId;

/// Domain-level error shared by every crate in the workspace.
///
/// Per-job failures (fetch, transform, worker crash) are never raised as
/// errors; they are recorded as [`JobOutcome::Failure`](crate::job::JobOutcome)
/// values instead. Only request-level problems surface here.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("The following URLs are invalid: {}", display_urls(.invalid_urls))]
    InvalidUrls { invalid_urls: Vec<serde_json::Value> },

    #[error("Batch not found: {batch_id}")]
    NotFound { batch_id: BatchId },

    #[error("Batch already exists: {0}")]
    DuplicateBatch(BatchId),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_urls(urls: &[serde_json::Value]) -> String {
    urls.iter()
        .map(|u| match u {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_urls_display_lists_every_entry() {
        let err = CoreError::InvalidUrls {
            invalid_urls: vec![serde_json::json!("not-a-url"), serde_json::json!(42)],
        };
        assert_eq!(
            err.to_string(),
            "The following URLs are invalid: not-a-url, 42"
        );
    }

    #[test]
    fn not_found_display_includes_batch_id() {
        let err = CoreError::NotFound {
            batch_id: "abc".into(),
        };
        assert_eq!(err.to_string(), "Batch not found: abc");
    }
}
