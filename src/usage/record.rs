use serde::Serialize;

/// One usage sample as sent to the collection endpoint.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    // environment
    pub user_id: String,
    /// Local time as `YYYY-MM-DD HH:MM:SS +HH:MM`. The zone is a numeric UTC
    /// offset, never an abbreviation such as `CET`.
    pub datetime: String,
    pub backend_hostname: Option<String>,
    pub backend_version: Option<String>,
    pub platform: String,
    pub sdk_version: String,
    // method
    pub method_name: String,
    pub module_name: String,
    pub arguments: String,
    /// Milliseconds.
    pub execution_time: u64,
    pub num_call: u64,
    // error
    pub last_error: Option<String>,
    pub stack_trace: Option<String>,
}

/// Wire envelope: `{"Data": {...}}`.
#[derive(Serialize, Debug)]
pub struct UsagePayload<'a> {
    #[serde(rename = "Data")]
    pub data: &'a UsageRecord,
}

impl<'a> From<&'a UsageRecord> for UsagePayload<'a> {
    fn from(data: &'a UsageRecord) -> Self {
        Self { data }
    }
}
