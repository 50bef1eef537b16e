use actix_web::{http::header::ContentType, web, HttpResponse};

use crate::startup::AppState;

/// GET /api/metrics
pub async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(format!("Hits: {}", state.hits.get()))
}

/// GET /admin/metrics
pub async fn admin_metrics(state: web::Data<AppState>) -> HttpResponse {
    let page = format!(
        r#"<html>
<body>
    <h1>Welcome, Chirpy Admin</h1>
    <p>Chirpy has been visited {} times!</p>
</body>
</html>
"#,
        state.hits.get()
    );

    HttpResponse::Ok().content_type(ContentType::html()).body(page)
}

/// /api/reset
pub async fn reset_metrics(state: web::Data<AppState>) -> HttpResponse {
    state.hits.reset();
    tracing::info!("File server hit counter reset");

    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("Metrics reset\n")
}
