//! Registration, login and the bootstrap admin account.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::auth::{hash_password, verify_password};
use crate::domain::aggregates::{NewUser, Role, SignUp, User, UserId, VendorId, VerificationStatus};
use crate::store::MarketStore;
use crate::uploads::{ImageStore, Upload};
use crate::{MarketError, Result};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct Registration {
    pub sign_up: SignUp,
    pub password: String,
    pub id_card: Option<Upload>,
}

/// What the storefront keeps about the signed-in user.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginProfile {
    pub user_id: UserId,
    pub full_name: String,
    pub student_number: String,
    pub role: Role,
    pub vendor_id: Option<VendorId>,
    pub shop_name: Option<String>,
    pub vendor_status: Option<VerificationStatus>,
}

/// Creates a buyer or vendor account. Vendors get a closed, unverified shop.
#[instrument(skip_all, fields(role = %registration.sign_up.role))]
pub async fn register(store: &dyn MarketStore, images: &ImageStore, registration: Registration) -> Result<User> {
    let Registration { mut sign_up, password, id_card } = registration;
    sign_up.has_id_card = id_card.is_some();
    let identity = sign_up.resolve()?;

    if store.find_user_by_student_number(&identity.student_number).await?.is_some() {
        warn!(student_number = %identity.student_number, "student number already registered");
        return Err(MarketError::Conflict("Student number already registered".to_string()));
    }
    let password_hash = hash_password(&password)?;
    let id_card_image = match &id_card {
        Some(upload) => Some(images.save(upload).await?),
        None => None,
    };

    let new_user = NewUser {
        student_number: identity.student_number,
        full_name: identity.full_name,
        password_hash,
        role: identity.role,
        id_card_image: id_card_image.clone(),
    };
    match store.create_user(new_user, identity.vendor).await {
        Ok(user) => {
            info!(user_id = user.user_id, "user registered");
            Ok(user)
        }
        Err(e) => {
            if let Some(url) = id_card_image { images.discard(&url).await; }
            Err(e)
        }
    }
}

#[instrument(skip(store, password))]
pub async fn login(store: &dyn MarketStore, student_number: &str, password: &str) -> Result<LoginProfile> {
    let Some(user) = store.find_user_by_student_number(student_number.trim()).await? else {
        warn!("login for unknown student number");
        return Err(MarketError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };
    if !verify_password(&user.password_hash, password)? {
        warn!(user_id = user.user_id, "wrong password");
        return Err(MarketError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let vendor = match user.role {
        Role::Vendor => store.find_vendor_by_user(user.user_id).await?,
        _ => None,
    };
    info!(user_id = user.user_id, role = %user.role, "login");
    Ok(LoginProfile {
        user_id: user.user_id,
        full_name: user.full_name,
        student_number: user.student_number,
        role: user.role,
        vendor_id: vendor.as_ref().map(|v| v.vendor_id),
        shop_name: vendor.as_ref().map(|v| v.shop_name.clone()),
        vendor_status: vendor.map(|v| v.verification_status),
    })
}

/// Creates the admin account on first start. Returns whether one was created.
#[instrument(skip(store, password))]
pub async fn ensure_admin(store: &dyn MarketStore, student_number: &str, password: &str) -> Result<bool> {
    if let Some(existing) = store.find_user_by_student_number(student_number).await? {
        if existing.role != Role::Admin {
            warn!(user_id = existing.user_id, "admin student number belongs to a non-admin account");
        }
        return Ok(false);
    }
    let admin = NewUser {
        student_number: student_number.to_string(),
        full_name: "Administrator".to_string(),
        password_hash: hash_password(password)?,
        role: Role::Admin,
        id_card_image: None,
    };
    let user = store.create_user(admin, None).await?;
    info!(user_id = user.user_id, "admin account created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::images;
    use crate::store::MemoryStore;

    fn id_card() -> Option<Upload> {
        Some(Upload { file_name: "school-id.jpg".into(), bytes: vec![0xff, 0xd8, 0xff] })
    }

    fn buyer(student_number: &str) -> Registration {
        Registration {
            sign_up: SignUp {
                full_name: Some("Ana Cruz".into()),
                student_number: Some(student_number.into()),
                role: Role::Buyer,
                ..SignUp::default()
            },
            password: "pa55word".into(),
            id_card: id_card(),
        }
    }

    #[tokio::test]
    async fn test_buyer_registers_and_logs_in() {
        let store = MemoryStore::new();
        let images = images().await;
        let user = register(&store, &images, buyer("21-0001")).await.unwrap();
        assert!(user.id_card_image.is_some());
        assert_ne!(user.password_hash, "pa55word");

        let profile = login(&store, "21-0001", "pa55word").await.unwrap();
        assert_eq!(profile.user_id, user.user_id);
        assert_eq!(profile.role, Role::Buyer);
        assert_eq!(profile.vendor_id, None);
    }

    #[tokio::test]
    async fn test_buyer_without_id_card_rejected() {
        let store = MemoryStore::new();
        let images = images().await;
        let mut registration = buyer("21-0001");
        registration.id_card = None;
        assert!(matches!(register(&store, &images, registration).await, Err(MarketError::Validation(_))));
        assert!(store.find_user_by_student_number("21-0001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_student_number() {
        let store = MemoryStore::new();
        let images = images().await;
        register(&store, &images, buyer("21-0001")).await.unwrap();
        let again = register(&store, &images, buyer("21-0001")).await;
        assert!(matches!(again, Err(MarketError::Conflict(_))));
        // only the first ID card stays on disk
        assert_eq!(std::fs::read_dir(images.dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_vendor_gets_pending_shop() {
        let store = MemoryStore::new();
        let images = images().await;
        let registration = Registration {
            sign_up: SignUp { role: Role::Vendor, shop_name: Some("Truffle Kings".into()), ..SignUp::default() },
            password: "fries4ever".into(),
            id_card: None,
        };
        let user = register(&store, &images, registration).await.unwrap();
        assert_eq!(user.student_number, "Truffle Kings");

        let profile = login(&store, "Truffle Kings", "fries4ever").await.unwrap();
        assert_eq!(profile.role, Role::Vendor);
        assert_eq!(profile.shop_name.as_deref(), Some("Truffle Kings"));
        assert_eq!(profile.vendor_status, Some(VerificationStatus::Pending));
        let vendor = store.find_vendor_by_user(user.user_id).await.unwrap().unwrap();
        assert!(!vendor.is_open);
        assert_eq!(vendor.course_section.as_deref(), Some("N/A"));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let store = MemoryStore::new();
        let images = images().await;
        register(&store, &images, buyer("21-0001")).await.unwrap();
        assert!(matches!(login(&store, "21-0001", "nope").await, Err(MarketError::Unauthorized(_))));
        assert!(matches!(login(&store, "99-9999", "pa55word").await, Err(MarketError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_admin_bootstrap_once() {
        let store = MemoryStore::new();
        assert!(ensure_admin(&store, "admin", "letmein").await.unwrap());
        assert!(!ensure_admin(&store, "admin", "letmein").await.unwrap());
        assert_eq!(login(&store, "admin", "letmein").await.unwrap().role, Role::Admin);
    }
}
