pub mod attribution;
pub mod campaigns;
pub mod conversions;
pub mod webhooks;

use axum::Router;

use crate::db::AppState;

/// All API routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(webhooks::router())
        .merge(conversions::router())
        .merge(campaigns::router())
        .merge(attribution::router())
}
