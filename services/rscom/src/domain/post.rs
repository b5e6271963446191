/// Post entity owned by the post-service database
use chrono::NaiveDateTime;

/// Lifecycle status of a post
///
/// Only `DELETED` carries meaning for the batch jobs; every other value is
/// preserved verbatim so rows round-trip without loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostStatus {
    /// Soft-deleted post, never repaired
    Deleted,
    /// Any other status string as stored in the database
    Other(String),
}

impl PostStatus {
    /// Status string used by the post-service for deleted posts
    pub const DELETED: &'static str = "DELETED";

    /// Parse the raw column value
    pub fn parse(raw: &str) -> Self {
        if raw == Self::DELETED {
            PostStatus::Deleted
        } else {
            PostStatus::Other(raw.to_string())
        }
    }

    /// Raw column value
    pub fn as_str(&self) -> &str {
        match self {
            PostStatus::Deleted => Self::DELETED,
            PostStatus::Other(raw) => raw,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, PostStatus::Deleted)
    }
}

/// A row of the `posts` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub status: PostStatus,
    /// Publishing channel (e.g. `IG`, `LTK`, `BLOG`)
    pub channel: String,
    pub created_at: NaiveDateTime,
    pub reporting_start_time: Option<NaiveDateTime>,
    pub reporting_end_time: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deleted_status() {
        let status = PostStatus::parse("DELETED");
        assert!(status.is_deleted());
        assert_eq!(status.as_str(), "DELETED");
    }

    #[test]
    fn test_parse_other_status_round_trips() {
        let status = PostStatus::parse("PUBLISHED");
        assert!(!status.is_deleted());
        assert_eq!(status, PostStatus::Other("PUBLISHED".to_string()));
        assert_eq!(status.as_str(), "PUBLISHED");
    }

    #[test]
    fn test_status_is_case_sensitive() {
        // The column is compared with `!=` in SQL, so lowercase is a different status
        assert!(!PostStatus::parse("deleted").is_deleted());
    }
}
