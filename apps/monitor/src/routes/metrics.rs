use actix_web::{HttpResponse, get, web};
use netprobe::PrometheusSink;
use netprobe::metrics::CONTENT_TYPE;
use tracing::error;

/// Prometheus scrape endpoint.
#[get("/metrics")]
pub async fn metrics_route(sink: web::Data<PrometheusSink>) -> HttpResponse {
    match sink.encode() {
        Ok(body) => HttpResponse::Ok().content_type(CONTENT_TYPE).body(body),
        Err(e) => {
            error!("failed to encode metrics: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
