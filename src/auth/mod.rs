//! Access-token authentication with role-based access control.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless) and
//! long-lived refresh tokens (7 days, database-tracked). The gate only
//! checks access tokens; renewal happens explicitly through `/refresh`.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, session_cookie};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AdminOnly, AnyRole, Auth, RoleConstraint, authorize};
pub use ip::extract_client_ip;
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
