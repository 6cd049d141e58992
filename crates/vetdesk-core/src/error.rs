use thiserror::Error;

/// Token-layer failures. Verification itself happens in the provider;
/// this is the contract every provider reports through.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("bad token signature")]
    BadSignature,
}

#[derive(Debug, Error)]
pub enum VetdeskError {
    /// Row absent or outside the caller's visibility scope. The two cases
    /// are deliberately indistinguishable.
    #[error("not found: {0}")]
    NotFound(String),

    /// Row visible but the action is denied for the caller's roles.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl VetdeskError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::InvalidTransition { .. } => 422,
            Self::Auth(_) => 401,
            Self::Internal(_) => 500,
        }
    }

    /// Shorthand for the scope-miss case; keeps call sites from
    /// re-spelling the entity wording.
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── http_status: exhaustive variant coverage ──────────────────

    #[test]
    fn http_status_not_found() {
        assert_eq!(VetdeskError::NotFound("x".into()).http_status(), 404);
    }

    #[test]
    fn http_status_forbidden() {
        assert_eq!(VetdeskError::Forbidden("x".into()).http_status(), 403);
    }

    #[test]
    fn http_status_validation() {
        assert_eq!(VetdeskError::Validation("x".into()).http_status(), 400);
    }

    #[test]
    fn http_status_conflict() {
        assert_eq!(VetdeskError::Conflict("x".into()).http_status(), 409);
    }

    #[test]
    fn http_status_invalid_transition() {
        let e = VetdeskError::InvalidTransition {
            from: "COMPLETED".into(),
            to: "CONFIRMED".into(),
        };
        assert_eq!(e.http_status(), 422);
    }

    #[test]
    fn http_status_auth() {
        assert_eq!(VetdeskError::Auth(AuthError::Expired).http_status(), 401);
    }

    #[test]
    fn http_status_internal() {
        let err = VetdeskError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.http_status(), 500);
    }

    // ── Display ──────────────────────────────────────────────────

    #[test]
    fn display_not_found() {
        let e = VetdeskError::not_found("appointment", "a1b2");
        assert_eq!(e.to_string(), "not found: appointment a1b2");
    }

    #[test]
    fn display_invalid_transition_names_both_states() {
        let e = VetdeskError::InvalidTransition {
            from: "CANCELLED".into(),
            to: "CONFIRMED".into(),
        };
        assert_eq!(e.to_string(), "invalid transition: CANCELLED -> CONFIRMED");
    }

    #[test]
    fn display_forbidden() {
        let e = VetdeskError::Forbidden("cancel requires staff".into());
        assert_eq!(e.to_string(), "forbidden: cancel requires staff");
    }

    #[test]
    fn display_conflict() {
        let e = VetdeskError::Conflict("slot taken".into());
        assert_eq!(e.to_string(), "conflict: slot taken");
    }

    // ── Auth variants stay distinguishable ───────────────────────

    #[test]
    fn auth_variants_distinct() {
        let all = [
            AuthError::MissingToken,
            AuthError::Malformed("no sub".into()),
            AuthError::Expired,
            AuthError::BadSignature,
        ];
        let rendered: Vec<String> = all.iter().map(|e| e.to_string()).collect();
        for (i, a) in rendered.iter().enumerate() {
            for b in rendered.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn auth_error_wraps_into_vetdesk_error() {
        let e: VetdeskError = AuthError::MissingToken.into();
        assert_eq!(e.to_string(), "auth: missing bearer token");
        assert_eq!(e.http_status(), 401);
    }
}
