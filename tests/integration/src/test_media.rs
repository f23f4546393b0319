//! Media endpoint: single uploads and multi-file fan-out.

#[cfg(test)]
mod tests {
    use quillpub_http::multipart::{MultipartPart, content_type_for, encode_multipart};
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{CREATE_TOKEN, SITE, start_server};

    #[tokio::test]
    async fn test_should_upload_single_file_to_public_path() {
        let server = start_server().await;
        let file = MultipartPart::file("file", "Sunset.PNG", Some("image/png".into()), "PNG");
        let resp = server
            .client
            .post(server.url("/api/media"))
            .bearer_auth(CREATE_TOKEN)
            .header("content-type", content_type_for("one"))
            .body(encode_multipart([&file], "one").to_vec())
            .send()
            .await
            .expect("upload");

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers()["location"],
            format!("{SITE}/images/sunset.png").as_str()
        );
        assert_eq!(
            server.store.content("src/images/sunset.png").as_deref(),
            Some(&b"PNG"[..])
        );
    }

    #[tokio::test]
    async fn test_should_fan_out_multiple_files() {
        let server = start_server().await;
        let parts = [
            MultipartPart::field("access_token", CREATE_TOKEN),
            MultipartPart::file("file", "a.jpg", Some("image/jpeg".into()), "A"),
            MultipartPart::file("file", "b.jpg", Some("image/jpeg".into()), "B"),
        ];
        let resp = server
            .client
            .post(server.url("/api/media"))
            .header("content-type", content_type_for("many"))
            .body(encode_multipart(&parts, "many").to_vec())
            .send()
            .await
            .expect("upload");

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(
            resp.headers()["access-control-expose-headers"]
                .to_str()
                .expect("ascii")
                .contains("Location")
        );
        let body: Value = resp.json().await.expect("json");
        assert_eq!(
            body,
            json!({
                "locations": [
                    format!("{SITE}/images/a.jpg"),
                    format!("{SITE}/images/b.jpg"),
                ]
            })
        );
        assert_eq!(server.store.content("src/images/b.jpg").as_deref(), Some(&b"B"[..]));
    }

    #[tokio::test]
    async fn test_should_report_null_for_rejected_fan_out_file() {
        let server = start_server().await;
        let parts = [
            MultipartPart::file("file", "a.jpg", Some("image/jpeg".into()), "A"),
            MultipartPart::file("file", "b.jpg", Some("image/jpeg".into()), "B"),
        ];
        let resp = server
            .client
            .post(server.url("/api/media"))
            .header("content-type", content_type_for("anon"))
            .body(encode_multipart(&parts, "anon").to_vec())
            .send()
            .await
            .expect("upload");

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body, json!({ "locations": [null, null] }));
        assert!(server.store.is_empty());
    }
}
