use crate::custom_token::CustomTokenMinter;
use crate::errors::{GatewayError, Result};
use crate::identity::IdentityProvider;
use crate::metrics::LOGINS_TOTAL;
use crate::models::{DataResponse, LoginRequest, LoginResponse, SubmitResponse};
use chrono::Utc;
use serde_json::Value;
use sheet_ledger::{EventRecordInput, LedgerReader, LedgerWriter};
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

pub const NO_DATA_MESSAGE: &str = "Bad Request: No data in request body.";

pub struct DashboardService {
    writer: LedgerWriter,
    reader: LedgerReader,
    identity: Arc<dyn IdentityProvider>,
    minter: Option<CustomTokenMinter>,
}

impl DashboardService {
    pub fn new(
        writer: LedgerWriter,
        reader: LedgerReader,
        identity: Arc<dyn IdentityProvider>,
        minter: Option<CustomTokenMinter>,
    ) -> Self {
        DashboardService {
            writer,
            reader,
            identity,
            minter,
        }
    }

    /// Append one submission to the ledger
    pub async fn submit(&self, body: &[u8]) -> Result<SubmitResponse> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(GatewayError::BadRequest(NO_DATA_MESSAGE.to_string()));
        }

        let value: Value = serde_json::from_slice(body).map_err(|e| {
            GatewayError::BadRequest(format!("Bad Request: Malformed JSON body ({})", e))
        })?;
        match &value {
            Value::Null => return Err(GatewayError::BadRequest(NO_DATA_MESSAGE.to_string())),
            Value::Object(map) if map.is_empty() => {
                return Err(GatewayError::BadRequest(NO_DATA_MESSAGE.to_string()))
            }
            Value::Object(_) => {}
            _ => {
                return Err(GatewayError::BadRequest(
                    "Bad Request: Body must be a JSON object.".to_string(),
                ))
            }
        }

        let input = EventRecordInput::from_json(value)?;
        let receipt = self.writer.append(input).await?;

        if !receipt.enrichment_failures.is_empty() {
            warn!(
                submission_id = %receipt.submission_id,
                failed = ?receipt.enrichment_failures,
                "Submission committed with formatting failures"
            );
        }

        Ok(receipt.into())
    }

    /// Rows of the current month
    pub async fn read_data(&self) -> Result<DataResponse> {
        let data = self.reader.read_all().await?;
        Ok(DataResponse { data })
    }

    /// Password login, plus a custom token when minting is configured
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        request
            .validate()
            .map_err(|e| GatewayError::Validation(e.to_string()))?;

        let sign_in = match self.identity.sign_in(&request.email, &request.password).await {
            Ok(sign_in) => sign_in,
            Err(e) => {
                let outcome = match e {
                    GatewayError::Unauthorized(_) => "rejected",
                    _ => "error",
                };
                LOGINS_TOTAL.with_label_values(&[outcome]).inc();
                return Err(e);
            }
        };

        let firebase_custom_token = match &self.minter {
            Some(minter) => match minter.mint(&sign_in.user_id, Utc::now()) {
                Ok(token) => {
                    info!(user_id = %sign_in.user_id, "Custom token generated");
                    Some(token)
                }
                Err(e) => {
                    error!(user_id = %sign_in.user_id, "Error creating custom token: {}", e);
                    None
                }
            },
            None => {
                warn!("Custom token minting not configured, skipping");
                None
            }
        };

        LOGINS_TOTAL.with_label_values(&["success"]).inc();
        Ok(LoginResponse {
            session: sign_in.session,
            user: sign_in.user,
            firebase_custom_token,
        })
    }
}
