use oso::PolarClass;
use serde::{Deserialize, Serialize};

pub const SYSTEM: &str = "system";
pub const RIDER: &str = "rider";
pub const VENDOR: &str = "vendor";

/// The acting session: who is calling and which platform roles the identity
/// provider granted them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub roles: Vec<String>,
}

impl User {
    pub fn new(id: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            id: id.into(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
        }
    }

    pub fn new_system_user() -> Self {
        Self::new("system", &[SYSTEM])
    }

    fn id_equals_nullable_id(&self, optional_id: Option<String>) -> bool {
        if let Some(id) = optional_id {
            if self.id == id {
                return true;
            }
        }

        false
    }

    pub fn has_role(&self, role: String) -> bool {
        self.roles.iter().any(|x| x == &role)
    }
}

impl PolarClass for User {
    fn get_polar_class_builder() -> oso::ClassBuilder<User> {
        oso::Class::builder()
            .name("User")
            .add_attribute_getter("id", |recv: &User| recv.id.clone())
            .add_attribute_getter("roles", |recv: &User| recv.roles.clone())
            .add_method("id_equals_nullable_id", User::id_equals_nullable_id)
            .add_method("has_role", User::has_role)
    }

    fn get_polar_class() -> oso::Class {
        let builder = User::get_polar_class_builder();
        builder.build()
    }
}
