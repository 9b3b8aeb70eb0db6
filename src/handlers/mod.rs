pub mod config;
pub mod convert;
pub mod inspect;

pub use self::config::{get_config, update_config};
pub use self::convert::convert;
pub use self::inspect::inspect_container;

use crate::error::{AppError, AppResult};
use actix_web::{HttpRequest, HttpResponse};

/// Fallback for unknown routes, so 404s share the JSON error format.
pub async fn not_found(req: HttpRequest) -> AppResult<HttpResponse> {
    Err(AppError::NotFound(format!(
        "No route for {} {}",
        req.method(),
        req.path()
    )))
}
