mod user_service;

pub use user_service::{UserService, DUPLICATE_USER_MESSAGE};
