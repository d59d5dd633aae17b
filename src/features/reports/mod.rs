//! Citizen issue reports.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Who | Description |
//! |--------|----------|-----|-------------|
//! | POST | `/api/reports` | Verified | Submit a report with up to 5 images |
//! | GET | `/api/reports` | Verified | List reports (citizens: own only) |
//! | GET | `/api/reports/stats` | Staff | Counts and resolution times |
//! | GET | `/api/reports/{id}` | Owner or staff | Report with comments and history |
//! | PUT | `/api/reports/{id}` | Owner (pending) or staff | Edit details |
//! | DELETE | `/api/reports/{id}` | Owner (pending) or staff | Delete report and images |
//! | PUT | `/api/reports/{id}/status` | Staff | Change status or assignee |
//! | POST | `/api/reports/{id}/comments` | Owner or staff | Add a comment |

pub mod dtos;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod services;

pub use services::ReportService;
