mod user;
mod user_device;

pub use user::{CreateUser, UpdateProfile, User, UserRole, UserSummary};
pub use user_device::{DeviceType, UserDevice};
