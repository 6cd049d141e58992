//! Caller identity: roles, role sets, and the authenticated principal.

use std::collections::HashMap;

use async_trait::async_trait;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AuthError, VetdeskError};

/// The closed set of roles a user can hold. Wire names are the
/// SCREAMING_SNAKE strings carried in token claims and user records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Receptionist,
    Veterinarian,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Receptionist => "RECEPTIONIST",
            Role::Veterinarian => "VETERINARIAN",
            Role::Client => "CLIENT",
        }
    }

    /// Parse the canonical wire name. Unknown or differently-cased
    /// names are rejected, not coerced.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "RECEPTIONIST" => Some(Role::Receptionist),
            "VETERINARIAN" => Some(Role::Veterinarian),
            "CLIENT" => Some(Role::Client),
            _ => None,
        }
    }

    const ALL: [Role; 4] = [
        Role::Admin,
        Role::Receptionist,
        Role::Veterinarian,
        Role::Client,
    ];
}

bitflags! {
    /// A user's role set. Visibility merges across roles are bitwise,
    /// so holding more roles can only widen what a principal sees.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RoleSet: u8 {
        const ADMIN = 1 << 0;
        const RECEPTIONIST = 1 << 1;
        const VETERINARIAN = 1 << 2;
        const CLIENT = 1 << 3;

        /// Every staff role; clients are the only non-staff role.
        const STAFF = Self::ADMIN.bits() | Self::RECEPTIONIST.bits() | Self::VETERINARIAN.bits();
    }
}

impl RoleSet {
    pub fn from_role(role: Role) -> Self {
        match role {
            Role::Admin => RoleSet::ADMIN,
            Role::Receptionist => RoleSet::RECEPTIONIST,
            Role::Veterinarian => RoleSet::VETERINARIAN,
            Role::Client => RoleSet::CLIENT,
        }
    }

    pub fn has(&self, role: Role) -> bool {
        self.contains(RoleSet::from_role(role))
    }

    pub fn is_staff(&self) -> bool {
        self.intersects(RoleSet::STAFF)
    }

    /// Wire names of the contained roles, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        Role::ALL
            .iter()
            .filter(|r| self.has(**r))
            .map(|r| r.as_str())
            .collect()
    }

    /// Parse a list of wire names. Any unknown name fails the whole set.
    pub fn parse(names: &[String]) -> Result<Self, String> {
        let mut set = RoleSet::empty();
        for name in names {
            let role =
                Role::from_str(name).ok_or_else(|| format!("unknown role name: {name}"))?;
            set |= RoleSet::from_role(role);
        }
        Ok(set)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        iter.into_iter()
            .fold(RoleSet::empty(), |acc, r| acc | RoleSet::from_role(r))
    }
}

impl serde::Serialize for RoleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

impl<'de> serde::Deserialize<'de> for RoleSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        RoleSet::parse(&names).map_err(serde::de::Error::custom)
    }
}

/// The authenticated caller. Every facade operation takes one explicitly;
/// there is no implicit or thread-local identity anywhere in the codebase.
#[derive(Debug, Clone)]
pub struct Principal {
    /// External user id from the token's `sub` claim. Doubles as the
    /// ownership key on pets, appointments, and records.
    pub user_id: String,
    pub roles: RoleSet,
    /// Staff clinic affiliation, joined from the user record at resolution
    /// time. `None` for clients and for staff not yet assigned to a clinic.
    pub clinic_id: Option<Uuid>,
}

impl Principal {
    /// Construct from verified token claims at the provider boundary.
    /// Core logic never reads raw tokens; expiry is checked by the
    /// provider before this runs.
    pub fn from_claims(claims: &Claims) -> Result<Self, VetdeskError> {
        let user_id = claims
            .sub
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::Malformed("missing sub claim".into()))?;
        let roles = RoleSet::parse(claims.roles.as_deref().unwrap_or_default())
            .map_err(AuthError::Malformed)?;
        Ok(Self {
            user_id,
            roles,
            clinic_id: None,
        })
    }

    /// Construct explicitly for in-process callers and tests.
    pub fn in_process(user_id: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
            clinic_id: None,
        }
    }

    pub fn with_clinic(mut self, clinic_id: Option<Uuid>) -> Self {
        self.clinic_id = clinic_id;
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.has(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn require_admin(&self) -> Result<(), VetdeskError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(VetdeskError::Forbidden(format!(
                "{} is not an admin",
                self.user_id
            )))
        }
    }

    pub fn is_self(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Verified token payload handed over by the identity provider.
/// Signature checking happens before this shape exists.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub roles: Option<Vec<String>>,
    /// Unix timestamp; absent means non-expiring (in-process tokens).
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: Option<HashMap<String, String>>,
}

impl Claims {
    pub fn new(sub: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            sub: Some(sub.into()),
            roles: Some(roles),
            exp: None,
            extra: None,
        }
    }

    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) => exp <= now.timestamp(),
            None => false,
        }
    }
}

/// Token-to-principal resolution seam. Implementations own signature
/// verification and the user-record join that fills `clinic_id`.
#[async_trait]
pub trait PrincipalProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Principal, VetdeskError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn role_wire_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
    }

    #[test]
    fn role_from_str_rejects_unknown_and_lowercase() {
        assert_eq!(Role::from_str("JANITOR"), None);
        assert_eq!(Role::from_str("admin"), None);
    }

    #[test]
    fn roleset_parse_and_names() {
        let set = RoleSet::parse(&["CLIENT".into(), "ADMIN".into()]).unwrap();
        assert!(set.has(Role::Admin));
        assert!(set.has(Role::Client));
        assert!(!set.has(Role::Veterinarian));
        assert_eq!(set.names(), vec!["ADMIN", "CLIENT"]);
    }

    #[test]
    fn roleset_parse_fails_whole_set_on_unknown() {
        let err = RoleSet::parse(&["ADMIN".into(), "WIZARD".into()]).unwrap_err();
        assert!(err.contains("WIZARD"));
    }

    #[test]
    fn roleset_staff_excludes_client() {
        assert!(RoleSet::RECEPTIONIST.is_staff());
        assert!(RoleSet::VETERINARIAN.is_staff());
        assert!(RoleSet::ADMIN.is_staff());
        assert!(!RoleSet::CLIENT.is_staff());
    }

    #[test]
    fn roleset_serde_uses_wire_names() {
        let set: RoleSet = [Role::Veterinarian, Role::Client].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["VETERINARIAN","CLIENT"]"#);
        let back: RoleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn from_claims_happy_path() {
        let claims = Claims::new("alice", vec!["RECEPTIONIST".into()]);
        let p = Principal::from_claims(&claims).unwrap();
        assert_eq!(p.user_id, "alice");
        assert!(p.has_role(Role::Receptionist));
        assert!(p.clinic_id.is_none());
    }

    #[test]
    fn from_claims_missing_sub() {
        let claims = Claims {
            sub: None,
            roles: Some(vec!["ADMIN".into()]),
            exp: None,
            extra: None,
        };
        let err = Principal::from_claims(&claims).unwrap_err();
        assert!(matches!(
            err,
            VetdeskError::Auth(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn from_claims_empty_sub_rejected() {
        let claims = Claims::new("", vec![]);
        let err = Principal::from_claims(&claims).unwrap_err();
        assert!(matches!(err, VetdeskError::Auth(AuthError::Malformed(_))));
    }

    #[test]
    fn from_claims_unknown_role_rejected() {
        let claims = Claims::new("bob", vec!["SUPERUSER".into()]);
        let err = Principal::from_claims(&claims).unwrap_err();
        assert!(matches!(err, VetdeskError::Auth(AuthError::Malformed(_))));
    }

    #[test]
    fn from_claims_no_roles_yields_empty_set() {
        let claims = Claims {
            sub: Some("carol".into()),
            roles: None,
            exp: None,
            extra: None,
        };
        let p = Principal::from_claims(&claims).unwrap();
        assert!(p.roles.is_empty());
    }

    #[test]
    fn claims_expiry_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut claims = Claims::new("d", vec![]);
        claims.exp = Some(now.timestamp() - 1);
        assert!(claims.expired_at(now));
        claims.exp = Some(now.timestamp());
        assert!(claims.expired_at(now));
        claims.exp = Some(now.timestamp() + 1);
        assert!(!claims.expired_at(now));
        claims.exp = None;
        assert!(!claims.expired_at(now));
    }

    #[test]
    fn require_admin_gates_on_role() {
        let admin = Principal::in_process("a", RoleSet::ADMIN);
        assert!(admin.require_admin().is_ok());
        let vet = Principal::in_process("v", RoleSet::VETERINARIAN);
        let err = vet.require_admin().unwrap_err();
        assert!(matches!(err, VetdeskError::Forbidden(_)));
    }

    #[test]
    fn with_clinic_attaches_affiliation() {
        let id = Uuid::new_v4();
        let p = Principal::in_process("r", RoleSet::RECEPTIONIST).with_clinic(Some(id));
        assert_eq!(p.clinic_id, Some(id));
    }
}
