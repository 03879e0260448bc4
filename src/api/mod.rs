//! HTTP surface: `/scim/v2/Users`, `/scim/v2/Groups` and `/health`.

pub mod health;
pub mod query;
pub mod resources;

pub use health::health_check;

use crate::state::AppState;
use crate::store::Store;
use axum::{Router, routing::get};
use scim_types::{Group, Resource, User};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// A resource type with its own endpoint and store.
pub trait Collection: Resource {
    fn store(state: &AppState) -> Arc<dyn Store<Self>>;
}

impl Collection for User {
    fn store(state: &AppState) -> Arc<dyn Store<Self>> {
        state.users.clone()
    }
}

impl Collection for Group {
    fn store(state: &AppState) -> Arc<dyn Store<Self>> {
        state.groups.clone()
    }
}

fn with_collection<T: Collection>(router: Router<AppState>) -> Router<AppState> {
    let base = format!("/scim/v2/{}", T::RESOURCE_TYPE.endpoint());
    router
        .route(&base, get(resources::list::<T>).post(resources::create::<T>))
        .route(
            &format!("{}/:id", base),
            get(resources::get::<T>)
                .put(resources::replace::<T>)
                .patch(resources::patch::<T>)
                .delete(resources::delete::<T>),
        )
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new().route("/health", get(health_check));
    let routes = with_collection::<Group>(with_collection::<User>(routes));
    routes.layer(TraceLayer::new_for_http()).with_state(state)
}
