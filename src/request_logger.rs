use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing to log one line per HTTP request with timing.
///
/// Status polling and health checks are logged at debug so a running import
/// does not flood the log.
pub struct RequestLogger;

fn is_polling_path(path: &str) -> bool {
    path.ends_with("/health") || path.ends_with("/imports/status")
}

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let started = request.local_cache(Instant::now);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let method = request.method();
        let uri = request.uri();
        let status = response.status().code;

        if is_polling_path(uri.path().as_str()) {
            log::debug!("{} {} -> {} ({:.2}ms)", method, uri, status, elapsed_ms);
        } else {
            log::info!("{} {} -> {} ({:.2}ms)", method, uri, status, elapsed_ms);
        }
    }
}
