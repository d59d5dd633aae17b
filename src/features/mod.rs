pub mod alerts;
pub mod auth;
pub mod reports;
pub mod schedules;
pub mod users;
