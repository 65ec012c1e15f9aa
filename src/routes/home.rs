//! Back-office page served at `/` for local use.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// GET / - Back-office page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use crate::test_support;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_index_serves_html() {
        let app = test_support::app().await;
        let (status, body) = app.get("/").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("/api/annonces"));
    }
}
