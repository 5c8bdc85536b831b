use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{smtp::sender_mailbox, MailError, MailSender};
use crate::config::HttpMailConfig;

/// Delivers through a transactional-mail HTTP API authenticated by bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(cfg: &HttpMailConfig, from_name: &str, from_address: &str) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            from: sender_mailbox(from_name, from_address)?.to_string(),
        })
    }
}

#[async_trait]
impl MailSender for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&OutgoingMail {
                from: &self.from,
                to: [to],
                subject,
                html,
            })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(%status, "mail api accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};

    use super::*;

    type Seen = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn spawn_provider(status: StatusCode) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/emails",
                post(
                    move |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        seen.lock().unwrap().push((auth, body));
                        (status, "{}")
                    },
                ),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/emails"), seen)
    }

    fn mailer(endpoint: String) -> HttpMailer {
        HttpMailer::new(
            &HttpMailConfig {
                api_key: "re_test".into(),
                endpoint,
            },
            "LISTI",
            "hola@listi.app",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn posts_message_with_bearer_key() {
        let (endpoint, seen) = spawn_provider(StatusCode::OK).await;
        mailer(endpoint)
            .send("ana@example.com", "Hola", "<p>hi</p>")
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer re_test"));
        assert_eq!(body["from"], "LISTI <hola@listi.app>");
        assert_eq!(body["to"], serde_json::json!(["ana@example.com"]));
        assert_eq!(body["subject"], "Hola");
        assert_eq!(body["html"], "<p>hi</p>");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (endpoint, _) = spawn_provider(StatusCode::UNPROCESSABLE_ENTITY).await;
        let err = mailer(endpoint)
            .send("ana@example.com", "Hola", "<p>hi</p>")
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Rejected { status: 422, .. }));
    }
}
