use serde::{Deserialize, Serialize};

/// Request body for user registration. Missing fields deserialize as `None`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, rename = "nombre")]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for confirming an emailed code.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "codigo")]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
