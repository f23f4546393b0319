//! Micropub create, update, delete and query flows.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{CREATE_TOKEN, FULL_TOKEN, SITE, TestServer, start_server};

    async fn form(server: &TestServer, token: &str, body: &'static str) -> reqwest::Response {
        server
            .client
            .post(server.url("/api/micropub"))
            .bearer_auth(token)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("micropub request")
    }

    async fn json_post(server: &TestServer, token: &str, body: Value) -> reqwest::Response {
        server
            .client
            .post(server.url("/api/micropub"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("micropub request")
    }

    #[tokio::test]
    async fn test_should_create_normalize_and_rewrite_location() {
        let server = start_server().await;
        let resp = form(
            &server,
            FULL_TOKEN,
            "h=entry&name=Hello+World&content=First+post",
        )
        .await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers()["location"],
            format!("{SITE}/posts/hello-world/").as_str()
        );
        assert!(
            resp.headers()["access-control-expose-headers"]
                .to_str()
                .expect("ascii")
                .contains("Location")
        );

        let text = server
            .store
            .text("src/posts/hello-world.md")
            .expect("post stored");
        assert!(text.contains("type: article"));
        assert!(text.contains("layout: layouts/article.njk"));
        assert!(text.contains("collectionType: post"));
        assert!(text.ends_with("First post\n"));
        // create commit followed by the normalization commit
        assert_eq!(server.store.commits().len(), 2);
    }

    #[tokio::test]
    async fn test_should_infer_like_from_json_create() {
        let server = start_server().await;
        let resp = json_post(
            &server,
            FULL_TOKEN,
            json!({
                "type": ["h-entry"],
                "properties": {
                    "like-of": ["https://other.example/post"],
                    "mp-slug": ["fav"]
                }
            }),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["location"], format!("{SITE}/posts/fav/").as_str());
        let text = server.store.text("src/posts/fav.md").expect("post stored");
        assert!(text.contains("type: like"));
        assert!(text.contains("layout: layouts/like.njk"));
    }

    #[tokio::test]
    async fn test_should_reject_request_without_token() {
        let server = start_server().await;
        let resp = server
            .client
            .post(server.url("/api/micropub"))
            .header("content-type", "application/x-www-form-urlencoded")
            .body("h=entry&content=hi")
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["error"], "unauthorized");
        assert!(server.store.is_empty());
    }

    #[tokio::test]
    async fn test_should_update_then_delete_post() {
        let server = start_server().await;
        let resp = form(&server, FULL_TOKEN, "h=entry&mp-slug=draft&content=Old").await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let url = format!("{SITE}/posts/draft/");

        let resp = json_post(
            &server,
            FULL_TOKEN,
            json!({ "action": "update", "url": url, "replace": { "content": ["New"] } }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let text = server.store.text("src/posts/draft.md").expect("post stored");
        assert!(text.ends_with("---\nNew\n"));
        assert!(text.contains("type: note"));

        let resp = json_post(&server, FULL_TOKEN, json!({ "action": "delete", "url": url })).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(server.store.text("src/posts/draft.md").is_none());
    }

    #[tokio::test]
    async fn test_should_require_delete_scope() {
        let server = start_server().await;
        server
            .store
            .put("src/posts/keep.md", "---\ntitle: \"Keep\"\n---\nx\n");
        let resp = json_post(
            &server,
            CREATE_TOKEN,
            json!({ "action": "delete", "url": format!("{SITE}/posts/keep/") }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["error"], "insufficient_scope");
        assert!(server.store.text("src/posts/keep.md").is_some());
    }

    #[tokio::test]
    async fn test_should_answer_source_query() {
        let server = start_server().await;
        let resp = form(&server, FULL_TOKEN, "h=entry&name=Sourced&content=Body").await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = server
            .client
            .get(server.url(
                "/api/micropub?q=source&url=https%3A%2F%2Fblog.example.com%2Fposts%2Fsourced%2F",
            ))
            .bearer_auth(FULL_TOKEN)
            .send()
            .await
            .expect("source");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["type"], json!(["h-entry"]));
        assert_eq!(body["properties"]["name"], json!(["Sourced"]));
        assert_eq!(body["properties"]["content"], json!(["Body"]));
    }
}
