//! Users and vendor profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::aggregates::product::VendorId;

pub type UserId = i64;

pub const DEFAULT_COURSE_SECTION: &str = "N/A";

/// Column widths of the identity fields.
pub const MAX_STUDENT_NUMBER_CHARS: usize = 100;
pub const MAX_NAME_CHARS: usize = 255;
pub const MAX_COURSE_SECTION_CHARS: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role { #[default] Buyer, Vendor, Admin }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Buyer => "BUYER", Self::Vendor => "VENDOR", Self::Admin => "ADMIN" }
    }
}

impl FromStr for Role {
    type Err = UserError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUYER" => Ok(Self::Buyer),
            "VENDOR" => Ok(Self::Vendor),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(UserError::UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus { #[default] Pending, Verified, Rejected }

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "PENDING", Self::Verified => "VERIFIED", Self::Rejected => "REJECTED" }
    }
}

impl FromStr for VerificationStatus {
    type Err = UserError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "VERIFIED" => Ok(Self::Verified),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(UserError::UnknownVerificationStatus(s.to_string())),
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: UserId,
    pub student_number: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub id_card_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub vendor_id: VendorId,
    pub user_id: UserId,
    pub shop_name: String,
    pub course_section: Option<String>,
    pub is_open: bool,
    pub verification_status: VerificationStatus,
    pub gcash_number: Option<String>,
    pub shop_description: Option<String>,
}

/// Vendor row for the admin dashboard.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorListing {
    #[serde(flatten)]
    pub vendor: Vendor,
    pub owner_name: String,
}

/// A user about to be inserted. The password is already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub student_number: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub id_card_image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewVendor {
    pub shop_name: String,
    pub course_section: String,
}

/// Sign-up input after the boundary has decoded it, before any checks.
#[derive(Clone, Debug, Default)]
pub struct SignUp {
    pub full_name: Option<String>,
    pub student_number: Option<String>,
    pub role: Role,
    pub shop_name: Option<String>,
    pub course_section: Option<String>,
    pub has_id_card: bool,
}

/// Identity fields of a sign-up once the per-role rules have been applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub student_number: String,
    pub full_name: String,
    pub role: Role,
    pub vendor: Option<NewVendor>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn fits(field: &'static str, value: &str, max: usize) -> Result<(), UserError> {
    if value.chars().count() > max { return Err(UserError::TooLong { field, max }); }
    Ok(())
}

impl Identity {
    fn checked(self) -> Result<Self, UserError> {
        fits("studentNumber", &self.student_number, MAX_STUDENT_NUMBER_CHARS)?;
        fits("fullName", &self.full_name, MAX_NAME_CHARS)?;
        if let Some(vendor) = &self.vendor {
            fits("shopName", &vendor.shop_name, MAX_NAME_CHARS)?;
            fits("courseSection", &vendor.course_section, MAX_COURSE_SECTION_CHARS)?;
        }
        Ok(self)
    }
}

impl SignUp {
    /// Buyers must present a school ID and their own name and student number.
    /// Vendors must name their shop; name and student number fall back to it.
    pub fn resolve(self) -> Result<Identity, UserError> {
        let identity = match self.role {
            Role::Buyer => {
                if !self.has_id_card { return Err(UserError::MissingIdCard); }
                let full_name = non_empty(self.full_name).ok_or(UserError::Missing("fullName"))?;
                let student_number = non_empty(self.student_number).ok_or(UserError::Missing("studentNumber"))?;
                Identity { student_number, full_name, role: Role::Buyer, vendor: None }
            }
            Role::Vendor => {
                let shop_name = non_empty(self.shop_name).ok_or(UserError::Missing("shopName"))?;
                let course_section = non_empty(self.course_section).unwrap_or_else(|| DEFAULT_COURSE_SECTION.to_string());
                Identity {
                    student_number: non_empty(self.student_number).unwrap_or_else(|| shop_name.clone()),
                    full_name: non_empty(self.full_name).unwrap_or_else(|| shop_name.clone()),
                    role: Role::Vendor,
                    vendor: Some(NewVendor { shop_name, course_section }),
                }
            }
            Role::Admin => return Err(UserError::AdminSignUp),
        };
        identity.checked()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    UnknownRole(String),
    UnknownVerificationStatus(String),
    Missing(&'static str),
    TooLong { field: &'static str, max: usize },
    MissingIdCard,
    AdminSignUp,
}
impl std::error::Error for UserError {}
impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRole(r) => write!(f, "Unknown role '{r}'"),
            Self::UnknownVerificationStatus(s) => write!(f, "Unknown verification status '{s}'"),
            Self::Missing(field) => write!(f, "{field} is required"),
            Self::TooLong { field, max } => write!(f, "{field} must be at most {max} characters"),
            Self::MissingIdCard => write!(f, "Buyers must upload a School ID for verification"),
            Self::AdminSignUp => write!(f, "Admin accounts cannot be self-registered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buyer_needs_id_card() {
        let sign_up = SignUp { full_name: Some("Ana Cruz".into()), student_number: Some("21-0001".into()), ..Default::default() };
        assert_eq!(sign_up.clone().resolve(), Err(UserError::MissingIdCard));
        let identity = SignUp { has_id_card: true, ..sign_up }.resolve().unwrap();
        assert_eq!(identity.student_number, "21-0001");
        assert_eq!(identity.vendor, None);
    }

    #[test]
    fn test_vendor_defaults_to_shop_name() {
        let identity = SignUp { role: Role::Vendor, shop_name: Some("Truffle Kings".into()), ..Default::default() }.resolve().unwrap();
        assert_eq!(identity.full_name, "Truffle Kings");
        assert_eq!(identity.student_number, "Truffle Kings");
        assert_eq!(identity.vendor, Some(NewVendor { shop_name: "Truffle Kings".into(), course_section: DEFAULT_COURSE_SECTION.into() }));
        assert_eq!(SignUp { role: Role::Vendor, ..Default::default() }.resolve(), Err(UserError::Missing("shopName")));
    }

    #[test]
    fn test_identity_fits_the_columns() {
        let buyer = SignUp {
            full_name: Some("Ana Cruz".into()),
            student_number: Some("9".repeat(MAX_STUDENT_NUMBER_CHARS + 1)),
            has_id_card: true,
            ..Default::default()
        };
        assert_eq!(buyer.resolve(), Err(UserError::TooLong { field: "studentNumber", max: MAX_STUDENT_NUMBER_CHARS }));

        // a long shop name is fine as a shop name but not as the fallback student number
        let shop = "S".repeat(MAX_STUDENT_NUMBER_CHARS + 1);
        let vendor = SignUp { role: Role::Vendor, shop_name: Some(shop.clone()), ..Default::default() };
        assert_eq!(vendor.clone().resolve(), Err(UserError::TooLong { field: "studentNumber", max: MAX_STUDENT_NUMBER_CHARS }));
        let identity = SignUp { student_number: Some("21-0100".into()), ..vendor.clone() }.resolve().unwrap();
        assert_eq!(identity.full_name, shop);

        let sprawling = SignUp { student_number: Some("21-0100".into()), shop_name: Some("S".repeat(MAX_NAME_CHARS + 1)), ..vendor };
        assert_eq!(sprawling.resolve(), Err(UserError::TooLong { field: "shopName", max: MAX_NAME_CHARS }));
    }

    #[test]
    fn test_admin_cannot_sign_up() {
        assert_eq!(SignUp { role: Role::Admin, has_id_card: true, ..Default::default() }.resolve(), Err(UserError::AdminSignUp));
        assert_eq!("vendor".parse::<Role>(), Ok(Role::Vendor));
        assert!("owner".parse::<Role>().is_err());
    }
}
