//! Municipal service schedules, weekly or one-off, per barangay.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Who | Description |
//! |--------|----------|-----|-------------|
//! | GET | `/api/schedules` | Verified | List with filters and filter options |
//! | POST | `/api/schedules` | Staff | Create schedule |
//! | GET | `/api/schedules/barangay/{barangay}` | Verified | Current schedules grouped by weekday |
//! | GET | `/api/schedules/upcoming` | Verified | Occurrences in the next `days` days |
//! | GET | `/api/schedules/service/{service_type}` | Verified | Current schedules grouped by barangay |
//! | GET | `/api/schedules/{id}` | Verified | Schedule detail |
//! | PUT | `/api/schedules/{id}` | Staff | Partial update |
//! | DELETE | `/api/schedules/{id}` | Staff | Delete schedule |

pub mod calendar;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::ScheduleService;
