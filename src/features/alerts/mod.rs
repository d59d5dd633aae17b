//! Official announcements with per-user read tracking.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Who | Description |
//! |--------|----------|-----|-------------|
//! | POST | `/api/alerts` | Staff | Publish an alert (multipart, optional `image`) |
//! | GET | `/api/alerts` | Verified | List alerts |
//! | GET | `/api/alerts/unread-count` | Verified | Visible active alerts not yet read |
//! | GET | `/api/alerts/{id}` | Verified | Alert detail; records a citizen's receipt |
//! | PUT | `/api/alerts/{id}` | Staff | Partial update (multipart) |
//! | DELETE | `/api/alerts/{id}` | Staff | Delete alert and receipts |
//! | POST | `/api/alerts/{id}/read` | Verified | Idempotent read receipt |
//! | GET | `/api/alerts/{id}/stats` | Staff | Read statistics |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod visibility;

pub use services::AlertService;
