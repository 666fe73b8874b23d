//! Authentication state trait and macro.

use crate::jwt::JwtConfig;

/// Trait for state types that can validate access tokens.
///
/// The gate is stateless: it needs the signing keys and nothing else.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
}

/// Implement `HasAuthBackend` for a state struct with a `jwt: Arc<JwtConfig>` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub jwt: Arc<JwtConfig>,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
        }
    };
}
