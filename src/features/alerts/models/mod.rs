mod alert;
mod alert_read;

pub use alert::{
    Alert, AlertCategory, AlertImportance, AlertWithCreator, CreateAlert, UpdateAlert,
};
pub use alert_read::{AlertRead, AlertReaderRow};
