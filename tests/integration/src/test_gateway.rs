//! Routing, health, CORS and environment gate tests.

#[cfg(test)]
mod tests {
    use quillpub_core::QuillConfig;
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{SITE, start_server, start_unconfigured_server};

    #[tokio::test]
    async fn test_should_report_health() {
        let server = start_server().await;
        let resp = server
            .client
            .get(server.url("/health"))
            .send()
            .await
            .expect("health");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["server"], "quillpub");
        assert!(resp.headers().contains_key("x-request-id"));
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body, json!({ "status": "running", "service": "micropub" }));
    }

    #[tokio::test]
    async fn test_should_answer_cors_preflight() {
        let server = start_server().await;
        let resp = server
            .client
            .request(reqwest::Method::OPTIONS, server.url("/api/micropub"))
            .send()
            .await
            .expect("preflight");
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert!(
            resp.headers()["access-control-allow-headers"]
                .to_str()
                .expect("ascii")
                .contains("Authorization")
        );
    }

    #[tokio::test]
    async fn test_should_return_404_for_unknown_path() {
        let server = start_server().await;
        let resp = server
            .client
            .get(server.url("/nope"))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_serve_config_query_with_public_base() {
        let server = start_server().await;
        let resp = server
            .client
            .get(server.url("/api/micropub?q=config"))
            .send()
            .await
            .expect("config");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["media-endpoint"], format!("{SITE}/api/media"));
        assert_eq!(body["post-types"][0], json!({ "type": "note", "name": "Note" }));
    }

    #[tokio::test]
    async fn test_should_serve_config_query_without_environment() {
        let server = start_unconfigured_server(QuillConfig::from_lookup(|_| None)).await;
        let resp = server
            .client
            .get(server.url("/api/micropub?q=config"))
            .send()
            .await
            .expect("config");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(
            body["media-endpoint"],
            format!("http://{}/api/media", server.addr)
        );
    }

    #[tokio::test]
    async fn test_should_list_missing_environment_variables() {
        let config = QuillConfig::from_lookup(|key| {
            (key == "ME").then(|| "https://blog.example.com/".to_owned())
        });
        let server = start_unconfigured_server(config).await;
        let resp = server
            .client
            .post(server.url("/api/micropub"))
            .header("content-type", "application/x-www-form-urlencoded")
            .body("h=entry&content=hi")
            .send()
            .await
            .expect("create");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["error"], "Missing environment variables");
        assert_eq!(
            body["missing"],
            json!([
                "TOKEN_ENDPOINT",
                "GITHUB_TOKEN",
                "GITHUB_USER",
                "GITHUB_REPO",
                "MICROPUB_BASE"
            ])
        );
    }

    #[tokio::test]
    async fn test_should_gate_media_endpoint() {
        let server = start_unconfigured_server(QuillConfig::from_lookup(|_| None)).await;
        let resp = server
            .client
            .post(server.url("/api/media"))
            .body("x")
            .send()
            .await
            .expect("media");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["missing"].as_array().map(Vec::len), Some(6));
    }
}
