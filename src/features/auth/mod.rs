//! Account registration, login and request identity.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | POST | `/api/auth/register` | No | Register a citizen account |
//! | POST | `/api/auth/login` | No | Exchange credentials for a JWT |
//! | POST | `/api/auth/verify-account` | No | Confirm the 6-digit code |
//! | POST | `/api/auth/resend-verification` | No | Issue a new code |
//! | POST | `/api/auth/forgot-password` | No | Email a reset link |
//! | POST | `/api/auth/reset-password` | No | Set a new password from a reset token |
//! | GET/PUT | `/api/auth/me` | Yes | Read or update the own profile |
//! | PUT | `/api/auth/change-password` | Verified | Change password |
//! | POST | `/api/auth/register-device` | Yes | Store a push device token |

mod jwt;

pub mod dtos;
pub mod guards;
pub mod handlers;
pub mod model;
pub mod password;
pub mod policy;
pub mod routes;
pub mod services;

pub use jwt::JwtService;
