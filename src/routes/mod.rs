mod checks;
mod fallback;
mod health_check;
mod tokens;
mod users;

pub use checks::{create_check, delete_check, get_checks, update_check};
pub use fallback::{method_not_allowed, not_found};
pub use health_check::ping;
pub use tokens::{create_token, extend_token, revoke_token};
pub use users::{create_user, delete_user, get_user, update_user};
