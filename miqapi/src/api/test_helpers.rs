//! Test helpers for the appliance API

use super::{Auth, Client, RetryConfig};

#[allow(dead_code)]
pub fn create_test_client(url: &str) -> Client {
    let retry = RetryConfig {
        max_retries: 2,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        timeout_seconds: 5,
    };
    Client::with_config(
        url,
        Auth::Basic {
            username: "admin".to_string(),
            password: "smartvm".to_string(),
        },
        true,
        retry,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use super::create_test_client;
    use mockito::{Matcher, Server};

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.initial_backoff_ms, 200);
        assert_eq!(config.max_backoff_ms, 5000);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_ms(1), 200);
        assert_eq!(config.backoff_ms(2), 400);
        assert_eq!(config.backoff_ms(5), 3200);
        assert_eq!(config.backoff_ms(6), 5000);
        assert_eq!(config.backoff_ms(70), 5000);
        assert_eq!(config.backoff_ms(u32::MAX), 5000);
    }

    #[test]
    fn test_api_query_params() {
        let params = ApiQueryParams::new()
            .expand_resources()
            .filter_eq("name", "my vm");

        let query = params.to_query_string();
        assert!(query.starts_with("?expand=resources&"));
        assert!(query.contains("filter[]=name%3D%27my%20vm%27"));
        assert_eq!(query.matches('&').count(), 1);
    }

    #[test]
    fn test_id_from_href() {
        use common::id_from_href;

        assert_eq!(
            id_from_href("https://a/api/vms/12/custom_attributes/34"),
            Some("34")
        );
        assert_eq!(id_from_href("/api/vms/12/"), Some("12"));
        assert_eq!(id_from_href("/api/vms/7?expand=resources"), Some("7"));
    }

    #[test]
    fn test_client_rejects_invalid_endpoint() {
        let result = Client::new("ftp://appliance", Auth::Token("t".to_string()), true);
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));

        let result = Client::new("not a url", Auth::Token("t".to_string()), true);
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_url_for_keeps_absolute_hrefs() {
        let client = create_test_client("https://appliance.example.com/");
        assert_eq!(
            client.url_for("/api/vms"),
            "https://appliance.example.com/api/vms"
        );
        assert_eq!(
            client.url_for("https://other.example.com/api/vms/1"),
            "https://other.example.com/api/vms/1"
        );
    }

    #[tokio::test]
    async fn test_server_version_from_entrypoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"name":"API","version":"3.0.0","server_info":{"version":"5.9.0.22","build":"20180212"}}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let version = client.server_version().await.unwrap();
        assert_eq!(version, "5.9.0.22");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_auth_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_header("x-auth-token", "abc123")
            .with_body(r#"{"server_info":{"version":"master"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), Auth::Token("abc123".to_string()), true).unwrap();
        assert_eq!(client.server_version().await.unwrap(), "master");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_retries_server_errors() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/api")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.get_entrypoint().await;
        assert!(matches!(result, Err(ApiError::ApiError { status: 503, .. })));
        failing.assert_async().await;

        let stats = client.get_request_stats().await;
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.failed_requests, 3);
        assert_eq!(stats.retried_requests, 2);
    }

    #[tokio::test]
    async fn test_post_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/vms/1")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.collection(CollectionKind::Vms).resource(&Resource {
            id: Some("1".to_string()),
            href: format!("{}/api/vms/1", server.url()),
            name: None,
            resource_type: None,
            guid: None,
        });
        let result = result.delete().await;
        assert!(matches!(result, Err(ApiError::ApiError { status: 500, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api")
            .with_status(401)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.get_entrypoint().await;
        assert!(matches!(result, Err(ApiError::AuthError)));
    }

    #[test]
    fn test_api_error_accessors() {
        let error = ApiError::ApiError {
            status: 404,
            message: "Couldn't find CustomAttribute with 'id'=5".to_string(),
            details: Some(Box::new(ApiErrorDetails {
                kind: Some("not_found".to_string()),
                message: None,
                klass: Some("ActiveRecord::RecordNotFound".to_string()),
            })),
        };

        assert!(error.is_not_found());
        assert_eq!(error.klass(), Some("ActiveRecord::RecordNotFound"));
        assert!(error.to_string().contains("HTTP 404"));
        assert_eq!(ApiError::AuthError.klass(), None);
    }
}
