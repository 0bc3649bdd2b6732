pub mod bookings;
pub mod events;
pub mod theaters;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(events::routes())
        .merge(theaters::routes())
        .merge(bookings::routes())
}
