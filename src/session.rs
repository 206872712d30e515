pub mod credential;
#[allow(clippy::module_inception)]
pub mod session;
