//! Session: voter and admin authentication state machines.
//!
//! Each machine is a pure reducer (`state.rs`, `admin.rs`) wrapped by a store that
//! performs the side effects: auth API calls, token persistence, and notifications.

pub mod admin;
pub mod api;
pub mod bootstrap;
pub mod state;
pub mod store;
pub mod user;

pub use admin::{reduce_admin, AdminAction, AdminSessionState, AdminSessionStore, AdminUser};
pub use api::{AuthApi, HttpAuthApi, LoginRequest, LoginResponse, ProfileResponse};
pub use bootstrap::{BootstrapOutcome, SessionBootstrapper};
pub use state::{reduce, SessionAction, SessionState};
pub use store::SessionStore;
pub use user::{RegistrationRequest, UserPatch, UserProfile};
