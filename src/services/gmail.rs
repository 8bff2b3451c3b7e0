// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Gmail API client for fetching inbox messages.
//!
//! Handles:
//! - Message id listing and bounded-parallel hydration
//! - Header extraction for list display (no MIME body decoding)
//! - 401 detection so callers can trigger a forced token refresh

use crate::error::{AppError, Result};
use crate::services::broker::TokenBroker;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;

const MAX_CONCURRENT_FETCHES: usize = 10;

/// Gmail REST client.
#[derive(Clone)]
pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
        }
    }

    /// List the newest message ids in the account's mailbox.
    pub async fn list_message_ids(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<String>> {
        let url = format!("{}/users/me/messages", self.base_url);
        let list: MessageListResponse = self
            .get_json(&url, access_token, &[("maxResults", max_results.to_string())])
            .await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    /// Fetch a single message by id (full format; only headers, labels and
    /// part filenames are read).
    pub async fn get_message(&self, access_token: &str, message_id: &str) -> Result<MessageResponse> {
        let url = format!("{}/users/me/messages/{}", self.base_url, message_id);
        self.get_json(&url, access_token, &[("format", "full".to_string())])
            .await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::GmailApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // Unauthorized - credential rejected, the authoritative signal
            // for a forced refresh
            if status.as_u16() == 401 {
                return Err(AppError::GmailApi(format!(
                    "{}: HTTP 401: {}",
                    AppError::GMAIL_AUTH_ERROR,
                    body
                )));
            }

            return Err(AppError::GmailApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::GmailApi(format!("JSON parse error: {}", e)))
    }
}

/// Message list response from Gmail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    id: String,
}

/// Full message response from Gmail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub payload: MessagePayload,
    /// Epoch milliseconds as a decimal string
    #[serde(default)]
    pub internal_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub filename: String,
}

/// What the inbox list renders for one message.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    pub id: String,
    pub thread_id: String,
    pub sender: String,
    pub sender_email: String,
    pub subject: String,
    pub snippet: String,
    pub date: DateTime<Utc>,
    pub is_read: bool,
    pub has_attachment: bool,
    pub label_ids: Vec<String>,
}

impl From<MessageResponse> for MessageSummary {
    fn from(message: MessageResponse) -> Self {
        let from = header_value(&message.payload.headers, "From");
        let (sender, sender_email) = parse_sender(&from);
        let subject = header_value(&message.payload.headers, "Subject");

        let date = message
            .internal_date
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        Self {
            id: message.id,
            thread_id: message.thread_id,
            sender,
            sender_email,
            subject: if subject.is_empty() {
                "(No Subject)".to_string()
            } else {
                subject
            },
            snippet: message.snippet,
            date,
            is_read: !message.label_ids.iter().any(|l| l == "UNREAD"),
            has_attachment: message
                .payload
                .parts
                .iter()
                .any(|part| !part.filename.is_empty()),
            label_ids: message.label_ids,
        }
    }
}

fn header_value(headers: &[MessageHeader], name: &str) -> String {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
        .unwrap_or_default()
}

/// Split a From header into display name and address.
/// Format can be `Name <addr@domain>` or just `addr@domain`.
fn parse_sender(from: &str) -> (String, String) {
    if let (Some(start), Some(end)) = (from.rfind('<'), from.rfind('>')) {
        if end > start {
            let email = from[start + 1..end].trim().to_string();
            let name = from[..start].trim().trim_matches('"').trim().to_string();
            if name.is_empty() {
                return (email.clone(), email);
            }
            return (name, email);
        }
    }
    (from.to_string(), from.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// GmailService - broker-backed mail fetching
// ─────────────────────────────────────────────────────────────────────────────

/// High-level mail fetcher that obtains credentials from the token broker
/// and performs exactly one forced-refresh retry when Gmail rejects one.
pub struct GmailService {
    client: GmailClient,
    broker: Arc<TokenBroker>,
}

impl GmailService {
    pub fn new(broker: Arc<TokenBroker>) -> Self {
        Self {
            client: GmailClient::new(),
            broker,
        }
    }

    /// Fetch the newest inbox messages for one connected account.
    pub async fn fetch_inbox(&self, email: &str, max_results: u32) -> Result<Vec<MessageSummary>> {
        let access_token = self.broker.get_token(email).await?;

        match self.fetch_with_token(&access_token, max_results).await {
            Ok(messages) => Ok(messages),
            Err(e) if e.is_auth_error() => {
                tracing::warn!(email, "Gmail rejected credential, forcing refresh");
                let access_token = self.broker.force_refresh(email).await?;
                self.fetch_with_token(&access_token, max_results).await
            }
            Err(e) => Err(e),
        }
    }

    /// List ids, then hydrate messages with bounded parallelism,
    /// preserving Gmail's newest-first ordering.
    async fn fetch_with_token(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>> {
        let ids = self.client.list_message_ids(access_token, max_results).await?;

        let messages = stream::iter(ids)
            .map(|id| {
                let client = self.client.clone();
                let token = access_token.to_string();
                async move { client.get_message(&token, &id).await }
            })
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        Ok(messages.into_iter().map(MessageSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sender_variants() {
        assert_eq!(
            parse_sender("GitHub <noreply@github.com>"),
            ("GitHub".to_string(), "noreply@github.com".to_string())
        );
        assert_eq!(
            parse_sender("\"Doe, Jane\" <jane@x.com>"),
            ("Doe, Jane".to_string(), "jane@x.com".to_string())
        );
        assert_eq!(
            parse_sender("bare@x.com"),
            ("bare@x.com".to_string(), "bare@x.com".to_string())
        );
        assert_eq!(
            parse_sender("<only@x.com>"),
            ("only@x.com".to_string(), "only@x.com".to_string())
        );
    }

    #[test]
    fn test_summarize_message() {
        let message = MessageResponse {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            label_ids: vec!["INBOX".to_string(), "UNREAD".to_string()],
            snippet: "hello there".to_string(),
            payload: MessagePayload {
                headers: vec![
                    MessageHeader {
                        name: "From".to_string(),
                        value: "Alice <alice@x.com>".to_string(),
                    },
                    MessageHeader {
                        name: "subject".to_string(),
                        value: "Hi".to_string(),
                    },
                ],
                parts: vec![MessagePart {
                    filename: "report.pdf".to_string(),
                }],
            },
            internal_date: "1700000000000".to_string(),
        };

        let summary = MessageSummary::from(message);
        assert_eq!(summary.sender, "Alice");
        assert_eq!(summary.sender_email, "alice@x.com");
        assert_eq!(summary.subject, "Hi");
        assert!(!summary.is_read);
        assert!(summary.has_attachment);
        assert_eq!(summary.date.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_message_response_field_mapping() {
        let message: MessageResponse = serde_json::from_str(
            r#"{
                "id": "m3",
                "threadId": "t3",
                "labelIds": ["INBOX"],
                "snippet": "hi",
                "payload": {"headers": [{"name": "From", "value": "a@x.com"}]},
                "internalDate": "1700000000000"
            }"#,
        )
        .unwrap();
        assert_eq!(message.thread_id, "t3");
        assert_eq!(message.payload.headers.len(), 1);
        assert!(message.payload.parts.is_empty());
    }

    #[test]
    fn test_summarize_defaults() {
        let message = MessageResponse {
            id: "m2".to_string(),
            thread_id: "t2".to_string(),
            label_ids: vec!["INBOX".to_string()],
            snippet: String::new(),
            payload: MessagePayload::default(),
            internal_date: String::new(),
        };

        let summary = MessageSummary::from(message);
        assert_eq!(summary.subject, "(No Subject)");
        assert!(summary.is_read);
        assert!(!summary.has_attachment);
    }
}
