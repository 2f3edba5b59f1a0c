//! In-memory voter registry and bearer sessions behind the mock auth endpoints.

use dashmap::DashMap;
use pagi_ballot_core::session::{RegistrationRequest, UserPatch, UserProfile};

/// OTP accepted for every registered voter in the mocked login flow.
pub const DEMO_OTP: &str = "123456";

/// Voter seeded at startup so the login flow works on a fresh gateway.
pub const DEMO_EPIC_ID: &str = "ABC1234567";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Voter not found")]
    VoterNotFound,
    #[error("Invalid OTP")]
    InvalidOtp,
    #[error("Voter already registered")]
    AlreadyRegistered,
    #[error("Invalid or expired session")]
    Unauthorized,
    #[error("{0}")]
    Invalid(String),
}

fn normalize_epic(epic_id: &str) -> String {
    epic_id.trim().to_ascii_uppercase()
}

fn validate_epic(epic_id: &str) -> Result<(), RegistryError> {
    if epic_id.len() == 10 && epic_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(RegistryError::Invalid(
            "EPIC number must be 10 letters or digits".into(),
        ))
    }
}

fn validate_phone(phone: &str) -> Result<(), RegistryError> {
    if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(RegistryError::Invalid("Phone number must be 10 digits".into()))
    }
}

fn require(field: &str, value: &str) -> Result<String, RegistryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RegistryError::Invalid(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

pub struct VoterRegistry {
    /// EPIC id -> profile.
    voters: DashMap<String, UserProfile>,
    /// Bearer token -> EPIC id.
    sessions: DashMap<String, String>,
    otp: String,
}

impl VoterRegistry {
    pub fn new(otp: impl Into<String>) -> Self {
        Self {
            voters: DashMap::new(),
            sessions: DashMap::new(),
            otp: otp.into(),
        }
    }

    /// Registry with one verified demo voter.
    pub fn seeded(otp: impl Into<String>) -> Self {
        let registry = Self::new(otp);
        registry.voters.insert(
            DEMO_EPIC_ID.to_string(),
            UserProfile {
                id: "voter-demo".to_string(),
                epic_id: DEMO_EPIC_ID.to_string(),
                name: "Demo Voter".to_string(),
                phone: "9876543210".to_string(),
                email: None,
                constituency: "New Delhi".to_string(),
                state: "Delhi".to_string(),
                is_verified: true,
                has_voted: false,
            },
        );
        registry
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn register(&self, request: &RegistrationRequest) -> Result<UserProfile, RegistryError> {
        let epic_id = normalize_epic(&request.voter_epic_id);
        validate_epic(&epic_id)?;
        let phone = request.phone.trim().to_string();
        validate_phone(&phone)?;

        let profile = UserProfile {
            id: format!("voter-{}", uuid::Uuid::new_v4()),
            epic_id: epic_id.clone(),
            name: require("Name", &request.name)?,
            phone,
            email: request
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            constituency: require("Constituency", &request.constituency)?,
            state: require("State", &request.state)?,
            is_verified: false,
            has_voted: false,
        };

        match self.voters.entry(epic_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                Ok(profile)
            }
        }
    }

    /// A correct OTP doubles as verification of a freshly registered voter. Each voter
    /// holds one session; a new login revokes the previous token.
    pub fn login(&self, epic_id: &str, otp: &str) -> Result<(String, UserProfile), RegistryError> {
        let epic_id = normalize_epic(epic_id);
        let mut voter = self
            .voters
            .get_mut(&epic_id)
            .ok_or(RegistryError::VoterNotFound)?;
        if otp.trim() != self.otp {
            return Err(RegistryError::InvalidOtp);
        }
        voter.is_verified = true;
        let profile = voter.clone();
        drop(voter);

        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.retain(|_, owner| *owner != epic_id);
        self.sessions.insert(token.clone(), epic_id);
        Ok((token, profile))
    }

    pub fn verify(&self, token: &str) -> Result<UserProfile, RegistryError> {
        let epic_id = self
            .sessions
            .get(token)
            .map(|e| e.value().clone())
            .ok_or(RegistryError::Unauthorized)?;
        self.voters
            .get(&epic_id)
            .map(|v| v.value().clone())
            .ok_or(RegistryError::Unauthorized)
    }

    /// Apply a profile change; the stored (normalized) profile is returned.
    pub fn update_profile(&self, token: &str, patch: &UserPatch) -> Result<UserProfile, RegistryError> {
        let epic_id = self
            .sessions
            .get(token)
            .map(|e| e.value().clone())
            .ok_or(RegistryError::Unauthorized)?;

        // Client-supplied verification and voting flags are ignored.
        let normalized = UserPatch {
            name: patch.name.as_deref().map(|n| require("Name", n)).transpose()?,
            phone: patch.phone.as_deref().map(str::trim).map(str::to_string),
            email: patch
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            constituency: patch
                .constituency
                .as_deref()
                .map(|c| require("Constituency", c))
                .transpose()?,
            state: patch.state.as_deref().map(|s| require("State", s)).transpose()?,
            ..Default::default()
        };
        if let Some(phone) = &normalized.phone {
            validate_phone(phone)?;
        }

        let mut voter = self
            .voters
            .get_mut(&epic_id)
            .ok_or(RegistryError::Unauthorized)?;
        voter.apply(&normalized);
        Ok(voter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(epic: &str) -> RegistrationRequest {
        RegistrationRequest {
            voter_epic_id: epic.into(),
            name: " Asha Rao ".into(),
            phone: "9876543210".into(),
            email: Some("  ".into()),
            constituency: "Bengaluru South".into(),
            state: "Karnataka".into(),
        }
    }

    #[test]
    fn register_normalizes_and_rejects_duplicates() {
        let registry = VoterRegistry::new(DEMO_OTP);
        let profile = registry.register(&request("xyz0000001")).unwrap();
        assert_eq!(profile.epic_id, "XYZ0000001");
        assert_eq!(profile.name, "Asha Rao");
        assert_eq!(profile.email, None);
        assert!(!profile.is_verified);

        assert_eq!(
            registry.register(&request("XYZ0000001")),
            Err(RegistryError::AlreadyRegistered)
        );
        assert_eq!(registry.voter_count(), 1);
    }

    #[test]
    fn register_validates_fields() {
        let registry = VoterRegistry::new(DEMO_OTP);
        assert!(matches!(
            registry.register(&request("short")),
            Err(RegistryError::Invalid(_))
        ));
        let mut bad_phone = request("XYZ0000001");
        bad_phone.phone = "12345".into();
        assert!(matches!(registry.register(&bad_phone), Err(RegistryError::Invalid(_))));
        assert_eq!(registry.voter_count(), 0);
    }

    #[test]
    fn login_requires_known_voter_and_demo_otp() {
        let registry = VoterRegistry::seeded(DEMO_OTP);
        assert_eq!(
            registry.login("ZZZ9999999", DEMO_OTP).unwrap_err(),
            RegistryError::VoterNotFound
        );
        assert_eq!(
            registry.login(DEMO_EPIC_ID, "000000").unwrap_err(),
            RegistryError::InvalidOtp
        );

        let (token, user) = registry.login(&DEMO_EPIC_ID.to_lowercase(), DEMO_OTP).unwrap();
        assert_eq!(user.epic_id, DEMO_EPIC_ID);
        assert_eq!(registry.verify(&token).unwrap(), user);
    }

    #[test]
    fn login_marks_new_voter_verified() {
        let registry = VoterRegistry::new(DEMO_OTP);
        registry.register(&request("XYZ0000001")).unwrap();
        let (_, user) = registry.login("XYZ0000001", DEMO_OTP).unwrap();
        assert!(user.is_verified);
    }

    #[test]
    fn profile_update_keeps_identity_and_normalizes() {
        let registry = VoterRegistry::seeded(DEMO_OTP);
        let (token, before) = registry.login(DEMO_EPIC_ID, DEMO_OTP).unwrap();

        let updated = registry
            .update_profile(
                &token,
                &UserPatch {
                    name: Some("  Demo Voter II ".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Demo Voter II");
        assert_eq!(updated.id, before.id);
        assert_eq!(registry.verify(&token).unwrap().name, "Demo Voter II");

        let err = registry
            .update_profile(
                &token,
                &UserPatch {
                    phone: Some("abc".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Invalid(_)));
    }

    #[test]
    fn new_login_revokes_previous_token() {
        let registry = VoterRegistry::seeded(DEMO_OTP);
        let (first, _) = registry.login(DEMO_EPIC_ID, DEMO_OTP).unwrap();
        let (second, _) = registry.login(DEMO_EPIC_ID, DEMO_OTP).unwrap();

        assert_eq!(registry.verify(&first), Err(RegistryError::Unauthorized));
        assert!(registry.verify(&second).is_ok());
        assert_eq!(registry.session_count(), 1);

        for _ in 0..20 {
            registry.login(DEMO_EPIC_ID, DEMO_OTP).unwrap();
        }
        assert_eq!(registry.session_count(), 1);
    }
}
