use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    /// `"code"` or `"general"`; absent means general.
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub model: String,
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub loc: (&'static str, &'static str),
    pub msg: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub detail: Vec<FieldError>,
}

impl ValidationErrorResponse {
    pub fn missing(fields: &[&'static str]) -> Self {
        Self {
            detail: fields
                .iter()
                .map(|&field| FieldError {
                    loc: ("body", field),
                    msg: "Field required",
                    kind: "missing",
                })
                .collect(),
        }
    }
}
