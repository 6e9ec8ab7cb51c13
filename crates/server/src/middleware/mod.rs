pub mod auth;
pub mod model_loaders;

pub use auth::{OptionalUser, RequestContext, optional_user, require_user};
pub use model_loaders::*;
