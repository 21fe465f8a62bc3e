//! Session endpoints

use crate::TsmClient;
use crate::error::{ClientError, Result};
use backstop_core::dto::auth::{Credentials, LoginRequest};
use reqwest::Method;
use tracing::debug;

impl TsmClient {
    /// Open a TSM session
    ///
    /// The session cookie is kept by the client and sent with every later
    /// call. Any non-2xx answer is an [`ClientError::Authentication`].
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        debug!("Login in {} with {} username", self.base_url, credentials.name);

        let request = self
            .request(Method::POST, "login")
            .json(&LoginRequest::from(credentials.clone()));
        let response = self.send(request).await?;

        self.handle_empty_response(response)
            .await
            .map_err(|e| match e {
                ClientError::Api { status, body } => ClientError::Authentication { status, body },
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_login_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/0.5/login"))
            .and(body_json(json!({
                "authentication": {"name": "admin", "password": "secret"}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = TsmClient::new(server.uri(), "0.5").unwrap();
        client
            .login(&Credentials::new("admin", "secret"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/0.5/login"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let client = TsmClient::new(server.uri(), "0.5").unwrap();
        let err = client
            .login(&Credentials::new("admin", "wrong"))
            .await
            .unwrap_err();

        match err {
            ClientError::Authentication { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_cookie_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/0.5/login"))
            .respond_with(
                ResponseTemplate::new(204)
                    .insert_header("set-cookie", "workgroup_session_id=abc; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/0.5/asyncJobs"))
            .and(header("cookie", "workgroup_session_id=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"asyncJobs": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = TsmClient::new(server.uri(), "0.5").unwrap();
        client
            .login(&Credentials::new("admin", "secret"))
            .await
            .unwrap();
        assert!(client.list_jobs().await.unwrap().is_empty());
    }
}
