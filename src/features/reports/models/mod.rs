mod report;
mod report_comment;
mod report_image;
mod report_status_history;

pub use report::{CreateReport, Report, ReportPriority, ReportStatus, ReportType, UpdateReport};
pub use report_comment::ReportCommentRow;
pub use report_image::ReportImage;
pub use report_status_history::ReportStatusHistoryRow;
