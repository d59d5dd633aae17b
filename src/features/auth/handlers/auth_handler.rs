use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::dtos::{
    AuthResponseDto, ChangePasswordRequestDto, DeviceResponseDto, EmailRequestDto,
    LoginRequestDto, RegisterDeviceRequestDto, RegisterRequestDto, ResetPasswordRequestDto,
    UpdateProfileRequestDto, UserProfileDto, VerifyAccountRequestDto,
};
use crate::features::auth::guards::VerifiedUser;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::services::auth_service::FORGOT_PASSWORD_MESSAGE;
use crate::features::auth::services::AuthService;
use crate::shared::types::ApiResponse;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

/// Register a new citizen account
///
/// The account starts unverified; a 6-digit code is sent by SMS and email.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequestDto,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<UserProfileDto>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email or mobile number already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<RegisterRequestDto>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfileDto>>)> {
    dto.validate()?;

    let user = service.register(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            user,
            "Registration successful. Please check your phone and email for the verification code.",
        )),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequestDto,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials or account not verified")
    ),
    tag = "auth"
)]
pub async fn login(
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<LoginRequestDto>,
) -> Result<Json<ApiResponse<AuthResponseDto>>> {
    dto.validate()?;

    let auth_response = service.login(dto).await?;
    Ok(Json(ApiResponse::with_message(
        auth_response,
        "Login successful",
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-account",
    request_body = VerifyAccountRequestDto,
    responses(
        (status = 200, description = "Account verified"),
        (status = 400, description = "Invalid, expired or already used code"),
        (status = 404, description = "User not found")
    ),
    tag = "auth"
)]
pub async fn verify_account(
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<VerifyAccountRequestDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()?;

    service.verify_account(dto).await?;
    Ok(Json(ApiResponse::message(
        "Account verified successfully. You can now log in.",
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    request_body = EmailRequestDto,
    responses(
        (status = 200, description = "Verification code sent"),
        (status = 400, description = "Account already verified"),
        (status = 404, description = "User not found")
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<EmailRequestDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()?;

    service.resend_verification(&dto.email).await?;
    Ok(Json(ApiResponse::message(
        "Verification code sent successfully",
    )))
}

/// Request a password reset link
///
/// Always answers with the same message so that registered emails cannot be probed.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = EmailRequestDto,
    responses(
        (status = 200, description = "Reset link sent when the account exists"),
        (status = 400, description = "Validation error")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<EmailRequestDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()?;

    service.forgot_password(&dto.email).await?;
    Ok(Json(ApiResponse::message(FORGOT_PASSWORD_MESSAGE)))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequestDto,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired token, or weak password")
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<ResetPasswordRequestDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()?;

    service.reset_password(dto).await?;
    Ok(Json(ApiResponse::message("Password reset successful")))
}

/// Get current authenticated user info
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user retrieved successfully", body = ApiResponse<UserProfileDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(
    user: AuthenticatedUser,
    State(service): State<Arc<AuthService>>,
) -> Result<Json<ApiResponse<UserProfileDto>>> {
    let profile = service.me(user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    request_body = UpdateProfileRequestDto,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfileDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Mobile number already registered")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_me(
    user: AuthenticatedUser,
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<UpdateProfileRequestDto>,
) -> Result<Json<ApiResponse<UserProfileDto>>> {
    dto.validate()?;

    let profile = service.update_me(user.id, dto).await?;
    Ok(Json(ApiResponse::with_message(
        profile,
        "Profile updated successfully",
    )))
}

#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequestDto,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Current password is incorrect"),
        (status = 403, description = "Account not verified")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    VerifiedUser(user): VerifiedUser,
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<ChangePasswordRequestDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()?;

    service.change_password(user.id, dto).await?;
    Ok(Json(ApiResponse::message("Password changed successfully")))
}

/// Register a device token for push notifications
///
/// Idempotent per user and token: a repeated call answers 200.
#[utoipa::path(
    post,
    path = "/api/auth/register-device",
    request_body = RegisterDeviceRequestDto,
    responses(
        (status = 201, description = "Device registered", body = ApiResponse<DeviceResponseDto>),
        (status = 200, description = "Device already registered", body = ApiResponse<DeviceResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn register_device(
    user: AuthenticatedUser,
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<RegisterDeviceRequestDto>,
) -> Result<(StatusCode, Json<ApiResponse<DeviceResponseDto>>)> {
    dto.validate()?;

    let (device, created) = service.register_device(user.id, dto).await?;
    if created {
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::with_message(
                device,
                "Device registered successfully",
            )),
        ))
    } else {
        Ok((
            StatusCode::OK,
            Json(ApiResponse::with_message(device, "Device already registered")),
        ))
    }
}
