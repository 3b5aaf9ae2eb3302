pub mod access;
pub mod bearer;
pub mod guard;

pub use access::AuthenticationMiddleware;
