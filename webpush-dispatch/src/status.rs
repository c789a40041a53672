//! Status-code policy: how a push service response becomes an outcome.

use crate::error::PushServiceError;

/// Push-service mapping of a status code.
///
/// | Status        | Outcome                 |
/// |---------------|-------------------------|
/// | 200, 201, 202 | `Ok(())`                |
/// | 400           | `BadRequest`            |
/// | 401           | `Unauthorized`          |
/// | 403           | `Forbidden`             |
/// | 404           | `NotFound`              |
/// | 410           | `Gone`                  |
/// | 429           | `TooManyRequests`       |
/// | 500           | `InternalServerError`   |
/// | 503           | `ServiceUnavailable`    |
/// | other         | `UnexpectedResponse`    |
pub fn validate_status_code(status: u16) -> Result<(), PushServiceError> {
    match status {
        200 | 201 | 202 => Ok(()),
        400 => Err(PushServiceError::BadRequest),
        401 => Err(PushServiceError::Unauthorized),
        403 => Err(PushServiceError::Forbidden),
        404 => Err(PushServiceError::NotFound),
        410 => Err(PushServiceError::Gone),
        429 => Err(PushServiceError::TooManyRequests),
        500 => Err(PushServiceError::InternalServerError),
        503 => Err(PushServiceError::ServiceUnavailable),
        other => Err(PushServiceError::UnexpectedResponse(other)),
    }
}

/// Which mapping the dispatcher applies to response status codes.
#[derive(Debug, Clone, Copy, Default)]
pub enum StatusPolicy {
    /// [`validate_status_code`].
    #[default]
    Strict,
    /// Every status is handed back in the `Delivery`.
    Disabled,
    /// Caller-supplied mapping.
    Custom(fn(u16) -> Result<(), PushServiceError>),
}

impl StatusPolicy {
    pub fn check(&self, status: u16) -> Result<(), PushServiceError> {
        match self {
            Self::Strict => validate_status_code(status),
            Self::Disabled => Ok(()),
            Self::Custom(f) => f(status),
        }
    }

    pub fn from_flag(check_status_code: bool) -> Self {
        if check_status_code {
            Self::Strict
        } else {
            Self::Disabled
        }
    }
}
