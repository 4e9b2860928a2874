//! Verified caller identity and role checks.
//!
//! Credential parsing and token verification belong to the boundary layer.
//! The core only consumes the already-verified identity attached to each
//! mutating call and applies role policy to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Staff roles, as issued by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Receptionist,
    Accountant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
            Role::Accountant => "accountant",
        }
    }

    /// Parse a role string from the boundary layer. Any casing is accepted;
    /// auth backends disagree on it.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "receptionist" => Some(Role::Receptionist),
            "accountant" => Some(Role::Accountant),
            _ => None,
        }
    }
}

/// A verified caller identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque subject id of the authenticated user
    pub subject: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }
}

/// Reject callers whose role is not in `allowed`.
pub fn require_role(identity: &Identity, allowed: &[Role]) -> CoreResult<()> {
    if identity.has_role(allowed) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "role {} may not perform this operation",
            identity.role.as_str()
        )))
    }
}

/// Reject expired identities. Runs before every mutating operation.
pub fn require_active(identity: &Identity, now: DateTime<Utc>) -> CoreResult<()> {
    if identity.is_expired(now) {
        Err(CoreError::Forbidden(format!(
            "identity of {} has expired",
            identity.subject
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity(role: Role) -> Identity {
        let now = Utc::now();
        Identity {
            subject: "user-1".into(),
            role,
            issued_at: now,
            expires_at: now + Duration::hours(12),
        }
    }

    #[test]
    fn test_parse_role_folds_case() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("Accountant"), Some(Role::Accountant));
        assert_eq!(Role::parse("doctor"), Some(Role::Doctor));
        assert_eq!(Role::parse("receptionist"), Some(Role::Receptionist));
        assert_eq!(Role::parse("nurse"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_require_role() {
        let admin = identity(Role::Admin);
        assert!(admin.has_role(&[Role::Admin]));
        assert!(require_role(&admin, &[Role::Admin]).is_ok());
        assert!(require_role(&admin, &[Role::Admin, Role::Accountant]).is_ok());

        let doctor = identity(Role::Doctor);
        assert!(!doctor.has_role(&[Role::Admin, Role::Accountant]));
        let err = require_role(&doctor, &[Role::Admin]).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn test_expired_identity_rejected() {
        let mut id = identity(Role::Receptionist);
        assert!(require_active(&id, Utc::now()).is_ok());

        id.expires_at = Utc::now() - Duration::minutes(1);
        let err = require_active(&id, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}
