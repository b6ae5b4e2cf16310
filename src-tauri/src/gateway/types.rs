//! Wire types for the remote DICOM API.
//!
//! Field names follow the server's camelCase JSON. Unknown keys in open-ended
//! records (metadata, AI results) are preserved.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Upload counters arrive as integers, floats, `-1` or `null` depending on the
/// tier. Anything that is not a positive number reads as 0 (no limit).
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(count_from(raw))
}

fn lenient_count_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map(|v| count_from(Some(v))))
}

fn count_from(raw: Option<f64>) -> u32 {
    match raw {
        Some(v) if v.is_finite() && v > 0.0 => v.round().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

/// Response to `POST /dicom/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
    #[serde(default)]
    pub message: String,
}

/// An uploaded DICOM file as stored by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DicomFile {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cloudinary_public_id: String,
    /// Rendered preview of the first frame.
    #[serde(deserialize_with = "null_as_default")]
    pub cloudinary_secure_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: DicomMetadata,
    /// Empty until the file has been analysed.
    #[serde(deserialize_with = "null_as_default")]
    pub ai_results: Map<String, Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The part of a file record the viewer needs for its preview.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilePreview {
    #[serde(deserialize_with = "null_as_default")]
    pub cloudinary_secure_url: String,
}

/// Structured DICOM header values extracted by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DicomMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DicomMetadata {
    /// Key/value pairs for display: well-known keys first, then the rest in
    /// server order. String values are shown without JSON quoting.
    pub fn entries(&self) -> Vec<(String, String)> {
        let known = [
            ("patientName", &self.patient_name),
            ("patientId", &self.patient_id),
            ("studyDate", &self.study_date),
            ("modality", &self.modality),
        ];

        let mut entries: Vec<(String, String)> = known
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
            .collect();

        for (key, value) in &self.extra {
            let shown = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            entries.push((key.clone(), shown));
        }
        entries
    }
}

/// Server-side state of an inference job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Response to `GET /dicom/inference/status/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceStatus {
    pub status: JobStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Option<Vec<Value>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response to `POST /dicom/inference/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInferenceResponse {
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

/// Full payload of a completed inference job (`GET /dicom/files/{id}/ai-results`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    #[serde(default)]
    pub findings: Vec<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<BTreeMap<String, Measurement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response to login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Response to `GET /auth/verify`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

/// Response to `GET /stats`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_files: u64,
    pub total_inferences: u64,
    pub successful_inferences: u64,
    pub failed_inferences: u64,
    /// Megabytes.
    pub storage_used: f64,
    pub last_upload: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

/// One row of a tier's feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanFeature {
    pub name: &'static str,
    pub enabled: bool,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Pro => "Pro",
            Tier::Enterprise => "Enterprise",
        }
    }

    pub fn features(self) -> Vec<PlanFeature> {
        let rows: &[(&'static str, bool)] = match self {
            Tier::Free => &[
                ("5 DICOM uploads per month", true),
                ("Basic DICOM viewer", true),
                ("Standard support", true),
                ("Advanced analytics", false),
                ("Priority support", false),
                ("Unlimited uploads", false),
            ],
            Tier::Pro => &[
                ("50 DICOM uploads per month", true),
                ("Advanced DICOM viewer", true),
                ("Priority support", true),
                ("Basic analytics", true),
                ("API access", true),
                ("Unlimited uploads", false),
            ],
            Tier::Enterprise => &[
                ("Unlimited DICOM uploads", true),
                ("Enterprise viewer", true),
                ("24/7 support", true),
                ("Advanced analytics", true),
                ("Custom integrations", true),
                ("Dedicated account manager", true),
            ],
        };
        rows.iter()
            .map(|&(name, enabled)| PlanFeature { name, enabled })
            .collect()
    }
}

/// Response to `GET /subscription`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub tier: Tier,
    #[serde(deserialize_with = "lenient_count")]
    pub upload_count: u32,
    /// 0 means unlimited.
    #[serde(deserialize_with = "lenient_count")]
    pub upload_limit: u32,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

impl SubscriptionStatus {
    /// Share of the monthly quota used, 0 when the tier reports no limit.
    pub fn usage_percent(&self) -> f64 {
        if self.upload_limit == 0 {
            return 0.0;
        }
        f64::from(self.upload_count) / f64::from(self.upload_limit) * 100.0
    }

    pub fn near_limit(&self) -> bool {
        self.usage_percent() >= 90.0
    }
}

/// Response to `GET /subscription/limits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEligibility {
    pub can_upload: bool,
    #[serde(default, deserialize_with = "lenient_count_opt")]
    pub upload_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count_opt")]
    pub upload_limit: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A purchasable plan, managed through `/subscriptions`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionPlan {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub features: Vec<String>,
    /// Months.
    pub duration: u32,
}
