use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::extract::{Form, ValidatedJson};
use super::AppState;
use crate::domain::aggregates::{Role, SignUp};
use crate::services::accounts::{self, LoginProfile, Registration};
use crate::Result;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "studentNumber is required"))]
    pub student_number: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

pub async fn register(State(s): State<AppState>, mut form: Form) -> Result<(StatusCode, Json<Value>)> {
    let role = match form.text("role") {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::default(),
    };
    let registration = Registration {
        sign_up: SignUp {
            full_name: form.text("fullname"),
            student_number: form.text("studentnumber"),
            role,
            shop_name: form.text("shopname"),
            course_section: form.text("coursesection"),
            has_id_card: false,
        },
        password: form.secret("password")?,
        id_card: form.take_file("idcardimage"),
    };
    let user = accounts::register(s.store.as_ref(), &s.images, registration).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "User registered", "userId": user.user_id }))))
}

pub async fn login(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<LoginRequest>) -> Result<Json<LoginProfile>> {
    Ok(Json(accounts::login(s.store.as_ref(), &req.student_number, &req.password).await?))
}
