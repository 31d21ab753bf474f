use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    api::types::{StatusResponse, ValidationErrorResponse},
    mail::{compose, ArbitrationForm, Attachment, MailError},
    state::AppState,
};

pub const REQUIRED_FIELDS: [&str; 15] = [
    "dealerName",
    "dealerAcct",
    "contactName",
    "contactEmail",
    "contactPhone",
    "vin",
    "purchaseDate",
    "pickupDate",
    "odometerReading",
    "salePrice",
    "claimType",
    "defectArea",
    "repairCost",
    "defectDescription",
    "signature",
];

const FILES_FIELD: &str = "files";

#[derive(Debug)]
pub enum SubmitRejection {
    Multipart { status: StatusCode, reason: String },
    MissingFields(Vec<&'static str>),
    Mail(MailError),
}

impl SubmitRejection {
    fn multipart(err: MultipartError, context: &str) -> Self {
        Self::Multipart {
            status: err.status(),
            reason: format!("{context}: {}", err.body_text()),
        }
    }
}

impl IntoResponse for SubmitRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Multipart { status, reason } => {
                (status, format!("Invalid multipart payload: {reason}")).into_response()
            }
            Self::MissingFields(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationErrorResponse::missing(&fields)),
            )
                .into_response(),
            // 502 with a readable body rather than a dropped request, so browser
            // code can show the reason whatever the CORS setup.
            Self::Mail(err) => (
                StatusCode::BAD_GATEWAY,
                Json(StatusResponse::error(err.to_string())),
            )
                .into_response(),
        }
    }
}

pub async fn submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StatusResponse>, SubmitRejection> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut attachments = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SubmitRejection::multipart(e, "failed to read form"))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILES_FIELD {
            let filename = field.file_name().map(|s| s.to_string());
            let content_type = field.content_type().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| SubmitRejection::multipart(e, "failed to read file"))?;
            attachments.push(Attachment::new(
                filename.as_deref(),
                content_type.as_deref(),
                data,
            ));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| SubmitRejection::multipart(e, &name))?;
            fields.insert(name, value);
        }
    }

    let form = form_from_fields(fields).map_err(SubmitRejection::MissingFields)?;

    let submission_id = Uuid::new_v4();
    info!(
        %submission_id,
        dealer = %form.dealer_name,
        vin = %form.vin,
        files = attachments.len(),
        "arbitration request received"
    );

    let message = compose(&form, attachments);
    state.mailer.send(&message).await.map_err(|err| {
        error!(%submission_id, %err, "arbitration request not delivered");
        SubmitRejection::Mail(err)
    })?;

    info!(
        %submission_id,
        dry_run = state.mailer.is_dry_run(),
        attachments = message.attachments.len(),
        "arbitration request delivered"
    );

    Ok(Json(StatusResponse::ok()))
}

/// Required fields must be present and non-empty; values are not otherwise checked.
pub fn form_from_fields(
    mut fields: HashMap<String, String>,
) -> Result<ArbitrationForm, Vec<&'static str>> {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| fields.get(*name).map_or(true, |v| v.is_empty()))
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let mut take = |name: &str| fields.remove(name).unwrap_or_default();

    Ok(ArbitrationForm {
        dealer_name: take("dealerName"),
        dealer_acct: take("dealerAcct"),
        contact_name: take("contactName"),
        contact_email: take("contactEmail"),
        contact_phone: take("contactPhone"),
        vin: take("vin"),
        stock_number: take("stockNumber"),
        purchase_date: take("purchaseDate"),
        pickup_date: take("pickupDate"),
        odometer_reading: take("odometerReading"),
        sale_price: take("salePrice"),
        claim_type: take("claimType"),
        defect_area: take("defectArea"),
        repair_cost: take("repairCost"),
        defect_description: take("defectDescription"),
        signature: take("signature"),
    })
}
