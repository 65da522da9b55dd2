use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Profile;
use crate::db::types::{Gender, UserRole};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserRegister {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub(crate) password: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 2, message = "full_name must be at least 2 characters"))]
    pub(crate) full_name: String,
    #[serde(default = "default_role")]
    pub(crate) role: UserRole,
    pub(crate) gender: Gender,
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default, alias = "regNumber")]
    pub(crate) reg_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserLogin {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserUpdate {
    #[serde(default, alias = "fullName")]
    #[validate(length(min = 2, message = "full_name must be at least 2 characters"))]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default)]
    pub(crate) gender: Option<Gender>,
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default, alias = "regNumber")]
    pub(crate) reg_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersQuery {
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) gender: Gender,
    pub(crate) department: Option<String>,
    pub(crate) reg_number: Option<String>,
    pub(crate) created_at: String,
}

impl ProfileResponse {
    pub(crate) fn from_db(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role: profile.role,
            gender: profile.gender,
            department: profile.department,
            reg_number: profile.reg_number,
            created_at: format_primitive(profile.created_at),
        }
    }
}

fn default_role() -> UserRole {
    UserRole::Student
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_defaults_to_student() {
        let payload: UserRegister = serde_json::from_value(json!({
            "email": "asha@example.edu",
            "password": "secret1",
            "fullName": "Asha Rao",
            "gender": "female"
        }))
        .expect("payload");

        assert_eq!(payload.role, UserRole::Student);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn register_rejects_short_password_and_bad_email() {
        let payload: UserRegister = serde_json::from_value(json!({
            "email": "not-an-email",
            "password": "12345",
            "full_name": "A",
            "gender": "male"
        }))
        .expect("payload");

        let errors = payload.validate().expect_err("invalid");
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("full_name"));
    }

    #[test]
    fn update_skips_absent_fields() {
        let payload: UserUpdate = serde_json::from_value(json!({ "role": "teacher" })).expect("payload");
        assert!(payload.validate().is_ok());
        assert_eq!(payload.role, Some(UserRole::Teacher));
        assert!(payload.full_name.is_none());
    }
}
