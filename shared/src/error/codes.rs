//! Unified error codes for the warden authorization service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors (decisions and the permission tree)
//! - 3xxx: API registry errors
//! - 4xxx: Role errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so admin front-ends can
/// switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Account is disabled
    AccountDisabled = 1002,

    // ==================== 2xxx: Permission ====================
    /// Access denied
    PermissionDenied = 2001,
    /// Superuser required
    SuperuserRequired = 2002,
    /// Permission not found
    PermissionNotFound = 2101,
    /// Parent permission not found
    ParentPermissionNotFound = 2102,
    /// Permission code already used under the same parent
    PermissionCodeDuplicated = 2103,
    /// Parent would create a cycle
    PermissionParentInvalid = 2104,
    /// Permission code is malformed
    PermissionCodeInvalid = 2105,

    // ==================== 3xxx: API registry ====================
    /// API record not found
    ApiNotFound = 3001,
    /// API with the same method and path already exists
    ApiExists = 3002,
    /// Route is not exposed by the server
    RouteNotFound = 3003,

    // ==================== 4xxx: Role ====================
    /// Role not found
    RoleNotFound = 4001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the default English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            Self::Success => "Operation completed successfully",
            Self::Unknown => "An unknown error occurred",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",

            // Auth
            Self::NotAuthenticated => "Authentication required",
            Self::AccountDisabled => "Account is disabled",

            // Permission
            Self::PermissionDenied => "Access denied",
            Self::SuperuserRequired => "Superuser privileges required",
            Self::PermissionNotFound => "Permission not found",
            Self::ParentPermissionNotFound => "Parent permission not found",
            Self::PermissionCodeDuplicated => "Permission code already exists under this parent",
            Self::PermissionParentInvalid => "A permission cannot be moved under itself or its descendants",
            Self::PermissionCodeInvalid => "Permission code is invalid",

            // API registry
            Self::ApiNotFound => "API not found",
            Self::ApiExists => "API already exists",
            Self::RouteNotFound => "Route is not exposed by the server",

            // Role
            Self::RoleNotFound => "Role not found",

            // System
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(Self::Success),
            1 => Ok(Self::Unknown),
            2 => Ok(Self::ValidationFailed),
            3 => Ok(Self::NotFound),
            4 => Ok(Self::AlreadyExists),
            5 => Ok(Self::InvalidRequest),

            // Auth
            1001 => Ok(Self::NotAuthenticated),
            1002 => Ok(Self::AccountDisabled),

            // Permission
            2001 => Ok(Self::PermissionDenied),
            2002 => Ok(Self::SuperuserRequired),
            2101 => Ok(Self::PermissionNotFound),
            2102 => Ok(Self::ParentPermissionNotFound),
            2103 => Ok(Self::PermissionCodeDuplicated),
            2104 => Ok(Self::PermissionParentInvalid),
            2105 => Ok(Self::PermissionCodeInvalid),

            // API registry
            3001 => Ok(Self::ApiNotFound),
            3002 => Ok(Self::ApiExists),
            3003 => Ok(Self::RouteNotFound),

            // Role
            4001 => Ok(Self::RoleNotFound),

            // System
            9001 => Ok(Self::InternalError),
            9002 => Ok(Self::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
