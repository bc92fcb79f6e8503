pub mod auth;
pub mod keyed_mutex;
pub mod naming;
pub mod validation;
