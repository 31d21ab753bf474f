use axum::body::Bytes;

const OCTET_STREAM: (&str, &str) = ("application", "octet-stream");

/// Dealer arbitration claim as submitted by the web form. Values are free text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArbitrationForm {
    pub dealer_name: String,
    pub dealer_acct: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub vin: String,
    pub stock_number: String,
    pub purchase_date: String,
    pub pickup_date: String,
    pub odometer_reading: String,
    pub sale_price: String,
    pub claim_type: String,
    pub defect_area: String,
    pub repair_cost: String,
    pub defect_description: String,
    pub signature: String,
}

/// An uploaded file, held fully in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
    pub filename: String,
    pub mime_type: String,
    pub subtype: String,
    pub data: Bytes,
}

impl MailAttachment {
    pub fn content_type(&self) -> String {
        format!("{}/{}", self.mime_type, self.subtype)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<MailAttachment>,
}

impl Attachment {
    pub fn new(filename: Option<&str>, content_type: Option<&str>, data: Bytes) -> Self {
        Self {
            filename: filename
                .filter(|name| !name.is_empty())
                .unwrap_or("attachment")
                .to_string(),
            content_type: content_type.unwrap_or_default().to_string(),
            data,
        }
    }
}

pub fn subject_for(form: &ArbitrationForm) -> String {
    format!("Arbitration Request - {} - {}", form.dealer_name, form.vin)
}

pub fn render_body(form: &ArbitrationForm) -> String {
    [
        "Clutch Arbitration Request".to_string(),
        String::new(),
        format!("Dealer Name: {}", form.dealer_name),
        format!("Dealer Account #: {}", form.dealer_acct),
        format!("Primary Contact: {}", form.contact_name),
        format!("Contact Email: {}", form.contact_email),
        format!("Contact Phone: {}", form.contact_phone),
        String::new(),
        format!("VIN: {}", form.vin),
        format!("Stock/Lot #: {}", form.stock_number),
        format!("Purchase Date: {}", form.purchase_date),
        format!("Pickup Date: {}", form.pickup_date),
        format!("Odometer: {}", form.odometer_reading),
        format!("Sale Price: {}", form.sale_price),
        String::new(),
        format!("Claim Type: {}", form.claim_type),
        format!("Defect Area: {}", form.defect_area),
        format!("Repair Cost: {}", form.repair_cost),
        "Description:".to_string(),
        form.defect_description.clone(),
        String::new(),
        format!("Signature: {}", form.signature),
    ]
    .join("\n")
}

/// Split `major/minor`; anything without a slash is generic binary.
pub fn mime_parts(content_type: &str) -> (String, String) {
    match content_type.split_once('/') {
        Some((major, minor)) => (major.to_string(), minor.to_string()),
        None => (OCTET_STREAM.0.to_string(), OCTET_STREAM.1.to_string()),
    }
}

/// Empty uploads are dropped without error.
pub fn compose(form: &ArbitrationForm, attachments: Vec<Attachment>) -> OutboundMessage {
    let attachments = attachments
        .into_iter()
        .filter(|att| !att.data.is_empty())
        .map(|att| {
            let (mime_type, subtype) = mime_parts(&att.content_type);
            MailAttachment {
                filename: att.filename,
                mime_type,
                subtype,
                data: att.data,
            }
        })
        .collect();

    OutboundMessage {
        subject: subject_for(form),
        body: render_body(form),
        attachments,
    }
}

#[cfg(test)]
pub(crate) fn sample_form() -> ArbitrationForm {
    ArbitrationForm {
        dealer_name: "Maple Motors".into(),
        dealer_acct: "D-1042".into(),
        contact_name: "Sam Ortiz".into(),
        contact_email: "sam@maplemotors.test".into(),
        contact_phone: "555-0100".into(),
        vin: "1HGCM82633A004352".into(),
        stock_number: "".into(),
        purchase_date: "2024-03-01".into(),
        pickup_date: "2024-03-04".into(),
        odometer_reading: "48211".into(),
        sale_price: "18500".into(),
        claim_type: "Mechanical".into(),
        defect_area: "Transmission".into(),
        repair_cost: "2300".into(),
        defect_description: "Slips in 3rd gear.\nWarning light on cold start.".into(),
        signature: "S. Ortiz".into(),
    }
}
