mod schedule;

pub use schedule::{DayOfWeek, ScheduleDraft, ScheduleFields, ServiceSchedule};
