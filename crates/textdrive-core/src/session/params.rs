//! Session restoration string.
//!
//! Format: `u=<userId>&f=<id1>,<id2>`. Both fields are optional; unknown
//! fields are ignored on parse.

use std::fmt;

const USER_FIELD: &str = "u";
const FILES_FIELD: &str = "f";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    pub user_id: Option<String>,
    /// Ordered, duplicate free.
    pub file_ids: Vec<String>,
}

impl SessionParams {
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        let query = query.trim().trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                USER_FIELD => {
                    params.user_id = Some(value.to_string()).filter(|v| !v.is_empty());
                }
                FILES_FIELD => {
                    params.file_ids.clear();
                    for id in value.split(',').filter(|id| !id.is_empty()) {
                        if !params.file_ids.iter().any(|known| known == id) {
                            params.file_ids.push(id.to_string());
                        }
                    }
                }
                other => {
                    tracing::debug!("[Index] ignoring unknown session field '{}'", other);
                }
            }
        }
        params
    }

    pub fn to_query_string(&self) -> String {
        let mut fields = Vec::with_capacity(2);
        if let Some(user_id) = self.user_id.as_deref().filter(|u| !u.is_empty()) {
            fields.push(format!("{USER_FIELD}={user_id}"));
        }
        if !self.file_ids.is_empty() {
            fields.push(format!("{FILES_FIELD}={}", self.file_ids.join(",")));
        }
        fields.join("&")
    }
}

impl fmt::Display for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_fields() {
        let params = SessionParams::parse("u=1234&f=abc,def");
        assert_eq!(params.user_id.as_deref(), Some("1234"));
        assert_eq!(params.file_ids, vec!["abc", "def"]);
        assert_eq!(params.to_query_string(), "u=1234&f=abc,def");
    }

    #[test]
    fn test_parse_tolerates_noise() {
        let params = SessionParams::parse("?f=a,,b,a&x=1&u=");
        assert_eq!(params.user_id, None);
        assert_eq!(params.file_ids, vec!["a", "b"]);
        assert_eq!(params.to_query_string(), "f=a,b");
    }

    #[test]
    fn test_empty_session() {
        let params = SessionParams::parse("");
        assert_eq!(params, SessionParams::default());
        assert_eq!(params.to_query_string(), "");
    }
}
