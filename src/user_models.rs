use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Member roles. Unknown strings are kept verbatim so records round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    CoreMember,
    CollaboratingTeacher,
    DownloadMember,
    Other(String),
}

impl Role {
    /// Role given to every self-registered applicant.
    pub const SELF_REGISTERED: Role = Role::DownloadMember;

    pub fn as_wire(&self) -> &str {
        match self {
            Role::CoreMember => "核心成員",
            Role::CollaboratingTeacher => "協作教師",
            Role::DownloadMember => "下載會員",
            Role::Other(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw.trim() {
            "核心成員" => Role::CoreMember,
            "協作教師" => Role::CollaboratingTeacher,
            "下載會員" => Role::DownloadMember,
            other => Role::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "core" | "core-member" => Ok(Role::CoreMember),
            "teacher" | "collaborating-teacher" => Ok(Role::CollaboratingTeacher),
            "download" | "download-member" => Ok(Role::DownloadMember),
            _ => match Role::from_wire(s) {
                Role::Other(raw) => Err(format!(
                    "Unknown role '{}'. Use core, teacher or download",
                    raw
                )),
                known => Ok(known),
            },
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Role::from_wire(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "crate::models::lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::models::lenient::string")]
    pub email: String,
    #[serde(
        default,
        deserialize_with = "crate::models::lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub school: Option<String>,
    #[serde(default = "absent_role")]
    pub role: Role,
}

fn absent_role() -> Role {
    Role::Other(String::new())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Self-registration form. The confirmation never leaves the client.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub school: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<Registration, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField("email"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("password"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        if self.password != self.confirm {
            return Err(ValidationError::PasswordMismatch);
        }

        let school = self.school.trim();
        Ok(Registration {
            name: self.name.trim().to_string(),
            school: (!school.is_empty()).then(|| school.to_string()),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            role: Role::SELF_REGISTERED,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberApplication {
    #[serde(default, deserialize_with = "crate::models::lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::models::lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::models::lenient::opt_string")]
    pub school: Option<String>,
    #[serde(default = "requested_role_default")]
    pub role: Role,
    #[serde(default, alias = "createdAt", deserialize_with = "applied_at")]
    pub applied_at: Option<DateTime<Utc>>,
}

fn requested_role_default() -> Role {
    Role::SELF_REGISTERED
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
fn applied_at<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = crate::models::lenient::opt_string(deserializer)?;
    Ok(raw.and_then(|raw| parse_applied_at(&raw)))
}

fn parse_applied_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> RegistrationForm {
        RegistrationForm {
            name: "王小明".into(),
            school: "".into(),
            email: "wang@x.com".into(),
            password: "abcdef".into(),
            confirm: "abcdef".into(),
        }
    }

    #[test]
    fn registration_requests_fixed_role() {
        let registration = form().validate().unwrap();
        assert_eq!(registration.role, Role::DownloadMember);
        assert_eq!(registration.school, None);
        let body = serde_json::to_value(&registration).unwrap();
        assert_eq!(body["role"], "下載會員");
        assert!(body.get("confirm").is_none());
    }

    #[test]
    fn registration_rejects_bad_passwords() {
        let mut short = form();
        short.password = "abc".into();
        short.confirm = "abc".into();
        assert_eq!(
            short.validate().unwrap_err(),
            ValidationError::PasswordTooShort { min: 6 }
        );

        let mut mismatch = form();
        mismatch.confirm = "abcdeg".into();
        assert_eq!(mismatch.validate().unwrap_err(), ValidationError::PasswordMismatch);
    }

    #[test]
    fn registration_requires_name_and_email() {
        let mut nameless = form();
        nameless.name = " ".into();
        assert_eq!(nameless.validate().unwrap_err(), ValidationError::MissingField("name"));

        let mut no_email = form();
        no_email.email.clear();
        assert_eq!(no_email.validate().unwrap_err(), ValidationError::MissingField("email"));
    }

    #[test]
    fn roles_round_trip_including_unknown() {
        assert_eq!(Role::from_wire("協作教師"), Role::CollaboratingTeacher);
        let other = Role::from_wire("訪客");
        assert_eq!(other.as_wire(), "訪客");
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::CollaboratingTeacher);
        assert_eq!("核心成員".parse::<Role>().unwrap(), Role::CoreMember);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn user_without_role_has_empty_role() {
        let user: User = serde_json::from_value(json!({"name": "A", "email": "a@x.com"})).unwrap();
        assert_eq!(user.role, Role::Other(String::new()));
    }

    #[test]
    fn application_dates_accept_both_formats() {
        let app: MemberApplication = serde_json::from_value(json!({
            "name": "王小明",
            "email": "wang@x.com",
            "appliedAt": "2024-09-01"
        }))
        .unwrap();
        assert_eq!(app.role, Role::DownloadMember);
        assert_eq!(app.applied_at.unwrap().to_rfc3339(), "2024-09-01T00:00:00+00:00");

        assert!(parse_applied_at("2024-09-01T08:30:00+08:00").is_some());
        assert!(parse_applied_at("yesterday").is_none());
    }
}
