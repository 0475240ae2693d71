use super::{Resource, ResourceHook};
use crate::backend::Query;
use crate::error::BackendError;
use crate::guard::Role;
use serde::{Deserialize, Serialize};

pub struct UserRoles;

impl Resource for UserRoles {
    const TABLE: &'static str = "user_roles";
    type Record = UserRole;
    type New = NewUserRole;
    type Patch = UserRolePatch;
}

pub type UserRolesHook = ResourceHook<UserRoles>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: String,
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUserRole {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRolePatch {
    pub role: Role,
}

impl ResourceHook<UserRoles> {
    /// Every role granted to `user_id`, without duplicates
    pub async fn roles_for(&self, user_id: &str) -> Result<Vec<Role>, BackendError> {
        let query = Query::new().select("id,user_id,role").eq("user_id", user_id);
        let mut roles: Vec<Role> = Vec::new();
        for granted in self.list(&query).await? {
            if !roles.contains(&granted.role) {
                roles.push(granted.role);
            }
        }
        Ok(roles)
    }

    pub async fn grant(&self, user_id: &str, role: Role) -> Result<UserRole, BackendError> {
        let grant = NewUserRole {
            user_id: user_id.to_string(),
            role,
        };
        self.create(&grant).await
    }

    pub async fn revoke(&self, user_id: &str, role: &Role) -> Result<(), BackendError> {
        let query = Query::new()
            .eq("user_id", user_id)
            .eq("role", role.as_str());
        self.client().delete(UserRoles::TABLE, &query).await
    }
}
