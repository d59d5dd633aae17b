pub mod schedule_handler;

pub use schedule_handler::*;
