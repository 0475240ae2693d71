//! Role-based route gating.
//!
//! [`evaluate`] is a pure decision over the current auth and role state, so
//! any front end (CLI, server-rendered view, ...) can map the outcome to its
//! own loading/login/forbidden screens. [`RouteGuard`] resolves roles from
//! the backend and feeds them through the same decision.

use crate::config::Config;
use crate::hooks::UserRolesHook;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Buyer,
    Supplier,
    Arbitrator,
    Accountant,
    /// Any role the backend defines that this crate does not know about yet
    Other(String),
}

impl Role {
    pub fn parse(value: &str) -> Role {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "buyer" => Role::Buyer,
            "supplier" => Role::Supplier,
            "arbitrator" => Role::Arbitrator,
            "accountant" => Role::Accountant,
            _ => Role::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Buyer => "buyer",
            Role::Supplier => "supplier",
            Role::Arbitrator => "arbitrator",
            Role::Accountant => "accountant",
            Role::Other(name) => name,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Authentication state as reported by the session layer
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub loading: bool,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default)]
pub struct RoleState {
    pub loading: bool,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth or role data is still resolving
    Loading,
    /// No signed-in user; offer navigation to `login_path`
    Unauthenticated { login_path: String },
    Forbidden { missing_role: Role },
    Granted,
}

impl GuardDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, GuardDecision::Granted)
    }
}

/// Decide what a protected view should render.
///
/// Loading wins over everything else so a view never flashes a login or
/// permission-denied screen while state is still arriving. Every role,
/// including `admin`, must hold the required role explicitly.
pub fn evaluate(
    auth: &AuthState,
    roles: &RoleState,
    required: Option<&Role>,
    login_path: &str,
) -> GuardDecision {
    if auth.loading || roles.loading {
        return GuardDecision::Loading;
    }

    let Some(user) = &auth.user else {
        return GuardDecision::Unauthenticated {
            login_path: login_path.to_string(),
        };
    };

    match required {
        Some(role) if !roles.roles.contains(role) => {
            debug!("User {} lacks role {}", user.id, role);
            GuardDecision::Forbidden {
                missing_role: role.clone(),
            }
        }
        _ => GuardDecision::Granted,
    }
}

/// Resolves a user's roles from the backend and evaluates access.
#[derive(Clone)]
pub struct RouteGuard {
    roles: UserRolesHook,
    login_path: String,
}

impl RouteGuard {
    pub fn new(roles: UserRolesHook, login_path: &str) -> Self {
        Self {
            roles,
            login_path: login_path.to_string(),
        }
    }

    pub fn from_config(roles: UserRolesHook, config: &Config) -> Self {
        Self::new(roles, &config.login_path)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Check whether `user` may see a view requiring `required`.
    ///
    /// A failed role lookup is treated as holding no roles, so the user is
    /// denied rather than let through.
    pub async fn check(&self, user: Option<&User>, required: Option<&Role>) -> GuardDecision {
        let auth = AuthState {
            loading: false,
            user: user.cloned(),
        };

        let roles = match (user, required) {
            (Some(user), Some(_)) => match self.roles.roles_for(&user.id).await {
                Ok(roles) => roles,
                Err(e) => {
                    warn!("Failed to load roles for user {}: {}", user.id, e);
                    Vec::new()
                }
            },
            _ => Vec::new(),
        };

        evaluate(
            &auth,
            &RoleState {
                loading: false,
                roles,
            },
            required,
            &self.login_path,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendClient;
    use crate::retry::RetryConfig;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn signed_in() -> AuthState {
        AuthState {
            loading: false,
            user: Some(User {
                id: "u1".to_string(),
                email: Some("buyer@example.com".to_string()),
            }),
        }
    }

    fn holding(roles: &[Role]) -> RoleState {
        RoleState {
            loading: false,
            roles: roles.to_vec(),
        }
    }

    // ==================== Role Tests ====================

    #[test]
    fn test_role_parse_known_and_unknown() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse(" Supplier "), Role::Supplier);
        assert_eq!(
            Role::parse("logistics_partner"),
            Role::Other("logistics_partner".to_string())
        );
        assert_eq!(Role::Accountant.to_string(), "accountant");
    }

    #[test]
    fn test_role_serde_uses_plain_strings() {
        let json = serde_json::to_value(Role::Arbitrator).unwrap();
        assert_eq!(json, serde_json::json!("arbitrator"));
        let role: Role = serde_json::from_value(serde_json::json!("warehouse")).unwrap();
        assert_eq!(role, Role::Other("warehouse".to_string()));
    }

    // ==================== Decision Tests ====================

    #[test]
    fn test_loading_wins() {
        let auth = AuthState {
            loading: true,
            user: None,
        };
        assert_eq!(
            evaluate(&auth, &holding(&[]), Some(&Role::Admin), "/login"),
            GuardDecision::Loading
        );

        let roles = RoleState {
            loading: true,
            roles: vec![],
        };
        assert_eq!(
            evaluate(&signed_in(), &roles, None, "/login"),
            GuardDecision::Loading
        );
    }

    #[test]
    fn test_no_user_is_sent_to_login() {
        let decision = evaluate(&AuthState::default(), &holding(&[]), None, "/auth");
        assert_eq!(
            decision,
            GuardDecision::Unauthenticated {
                login_path: "/auth".to_string()
            }
        );
    }

    #[test]
    fn test_missing_role_is_named() {
        let decision = evaluate(
            &signed_in(),
            &holding(&[Role::Buyer]),
            Some(&Role::Arbitrator),
            "/login",
        );
        assert_eq!(
            decision,
            GuardDecision::Forbidden {
                missing_role: Role::Arbitrator
            }
        );
    }

    #[test]
    fn test_admin_gets_no_bypass() {
        let decision = evaluate(
            &signed_in(),
            &holding(&[Role::Buyer]),
            Some(&Role::Admin),
            "/login",
        );
        assert!(!decision.is_granted());
    }

    #[test]
    fn test_granted_with_role_or_without_requirement() {
        assert!(evaluate(&signed_in(), &holding(&[]), None, "/login").is_granted());
        assert!(evaluate(
            &signed_in(),
            &holding(&[Role::Buyer, Role::Supplier]),
            Some(&Role::Supplier),
            "/login"
        )
        .is_granted());
    }

    // ==================== RouteGuard Tests ====================

    fn guard(server: &MockServer) -> RouteGuard {
        let client = BackendClient::new(&server.uri(), "anon-key").with_retry(RetryConfig::no_retry());
        RouteGuard::new(UserRolesHook::new(client), "/login")
    }

    #[tokio::test]
    async fn test_guard_resolves_roles_from_backend() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .and(query_param("user_id", "eq.u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "r1", "user_id": "u1", "role": "accountant"}
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let guard = guard(&server);
        let user = signed_in().user;

        assert!(guard
            .check(user.as_ref(), Some(&Role::Accountant))
            .await
            .is_granted());
        assert_eq!(
            guard.check(user.as_ref(), Some(&Role::Admin)).await,
            GuardDecision::Forbidden {
                missing_role: Role::Admin
            }
        );
    }

    #[tokio::test]
    async fn test_guard_skips_lookup_when_not_needed() {
        let server = MockServer::start().await;
        let guard = guard(&server);

        assert!(matches!(
            guard.check(None, Some(&Role::Admin)).await,
            GuardDecision::Unauthenticated { .. }
        ));
        assert!(guard.check(signed_in().user.as_ref(), None).await.is_granted());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guard_denies_when_roles_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let decision = guard(&server)
            .check(signed_in().user.as_ref(), Some(&Role::Buyer))
            .await;
        assert_eq!(
            decision,
            GuardDecision::Forbidden {
                missing_role: Role::Buyer
            }
        );
    }
}
