mod identity;
mod logging;

pub use identity::IdentityMiddleware;
pub use logging::RequestLogger;
