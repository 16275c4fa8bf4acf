use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Metadata = HashMap<String, serde_json::Value>;

/// Origin of an ingested event. Open-ended: sources beyond the built-in
/// providers round-trip through `Other` without losing the original string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventSource {
    Gmail,
    Slack,
    Other(String),
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gmail => write!(f, "gmail"),
            Self::Slack => write!(f, "slack"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for EventSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "gmail" => Self::Gmail,
            "slack" => Self::Slack,
            _ => Self::Other(s.to_string()),
        })
    }
}

impl From<String> for EventSource {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Other(s))
    }
}

impl From<EventSource> for String {
    fn from(source: EventSource) -> Self {
        source.to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    #[default]
    Email,
    Message,
    Note,
    Unknown,
}

impl DocType {
    /// Default document type for events of a given source.
    pub fn for_source(source: &EventSource) -> Self {
        match source {
            EventSource::Gmail => Self::Email,
            EventSource::Slack => Self::Message,
            EventSource::Other(_) => Self::Message,
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Message => write!(f, "message"),
            Self::Note => write!(f, "note"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "message" => Ok(Self::Message),
            "note" => Ok(Self::Note),
            _ => Ok(Self::Unknown),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Pagination {
    pub current_page: u32,
    pub limit: u32,
    pub total_items: u32,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(current_page: u32, limit: u32, total_items: u32) -> Self {
        let total_pages = total_items.div_ceil(limit);
        Self {
            current_page,
            limit,
            total_items,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_source_display() {
        assert_eq!(EventSource::Gmail.to_string(), "gmail");
        assert_eq!(EventSource::Slack.to_string(), "slack");
        assert_eq!(
            EventSource::Other("linear".to_string()).to_string(),
            "linear"
        );
    }

    #[test]
    fn test_event_source_from_str() {
        assert_eq!("gmail".parse::<EventSource>().unwrap(), EventSource::Gmail);
        assert_eq!("Gmail".parse::<EventSource>().unwrap(), EventSource::Gmail);
        assert_eq!("slack".parse::<EventSource>().unwrap(), EventSource::Slack);
        assert_eq!(
            "linear".parse::<EventSource>().unwrap(),
            EventSource::Other("linear".to_string())
        );
    }

    #[test]
    fn test_event_source_serde_round_trip() {
        let json = serde_json::to_string(&EventSource::Gmail).unwrap();
        assert_eq!(json, "\"gmail\"");

        let parsed: EventSource = serde_json::from_str("\"gmail\"").unwrap();
        assert_eq!(parsed, EventSource::Gmail);

        let parsed: EventSource = serde_json::from_str("\"jira\"").unwrap();
        assert_eq!(parsed, EventSource::Other("jira".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"jira\"");
    }

    #[test]
    fn test_doc_type_for_source() {
        assert_eq!(DocType::for_source(&EventSource::Gmail), DocType::Email);
        assert_eq!(DocType::for_source(&EventSource::Slack), DocType::Message);
        assert_eq!(
            DocType::for_source(&EventSource::Other("linear".to_string())),
            DocType::Message
        );
    }

    #[test]
    fn test_doc_type_from_str_unknown() {
        assert_eq!("email".parse::<DocType>().unwrap(), DocType::Email);
        assert_eq!("whatever".parse::<DocType>().unwrap(), DocType::Unknown);
    }

    #[test]
    fn test_pagination_total_pages() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);

        let p = Pagination::new(1, 10, 30);
        assert_eq!(p.total_pages, 3);
    }
}
