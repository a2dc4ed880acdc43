use crate::access::{AuthContext, Decision};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheet_ledger::{AppendReceipt, Row};
use validator::Validate;

pub const SUBMIT_SUCCESS_MESSAGE: &str = "Data submitted successfully to combined sheet!";

/// Password login request
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Identity session plus the custom token for the permission store
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session: Value,
    pub user: Value,
    #[serde(rename = "firebaseCustomToken")]
    pub firebase_custom_token: Option<String>,
}

/// Committed submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub submission_id: String,
    pub partition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    pub header_block_inserted: bool,
}

impl From<AppendReceipt> for SubmitResponse {
    fn from(receipt: AppendReceipt) -> Self {
        Self {
            message: SUBMIT_SUCCESS_MESSAGE.to_string(),
            submission_id: receipt.submission_id.to_string(),
            partition: receipt.partition,
            row: receipt.row,
            header_block_inserted: receipt.header_block_inserted,
        }
    }
}

/// Current month's rows below row 1
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: Vec<Row>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub context: AuthContext,
    pub visible_categories: Vec<&'static str>,
}

impl From<&AuthContext> for SessionResponse {
    fn from(context: &AuthContext) -> Self {
        Self {
            visible_categories: context.visible_categories(),
            context: context.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub category: String,
    pub decision: Decision,
}
