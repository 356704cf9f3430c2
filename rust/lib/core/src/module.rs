use axum::Router;

/// A service module that contributes HTTP routes.
///
/// The daemon merges every module's router; routes carry their own
/// `/{name}/v1` prefix.
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes, with state already applied.
    fn routes(&self) -> Router;
}
