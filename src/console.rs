//! Cloud Console link rendering and operation tracking.
//!
//! The client surfaces deep links for the session page, the Spark UI, and
//! individual Spark operations. Operation IDs are assigned client-side
//! when the driver does not supply one, so every executed plan can be
//! linked to its Spark UI page.

use std::sync::Mutex;

use rand::RngCore;

const CONSOLE_BASE: &str = "https://console.cloud.google.com/dataproc/interactive";

/// Link to the session page in the Cloud Console.
pub fn session_url(project: &str, region: &str, session_id: &str) -> String {
    format!("{CONSOLE_BASE}/{region}/{session_id}?project={project}")
}

/// Link to the session details view.
pub fn session_details_url(project: &str, region: &str, session_id: &str) -> String {
    format!("{CONSOLE_BASE}/sessions/{session_id}/locations/{region}?project={project}")
}

/// Link to the Spark UI application list of a session.
pub fn spark_ui_url(project: &str, region: &str, session_id: &str) -> String {
    format!("{CONSOLE_BASE}/{region}/{session_id}/sparkApplications/applications?project={project}")
}

/// Link to the Spark UI page of a single SQL operation.
pub fn operation_url(
    project: &str,
    region: &str,
    session_id: &str,
    operation_id: &str,
) -> String {
    format!(
        "{CONSOLE_BASE}/{region}/{session_id}/sparkApplications/application;\
         associatedSqlOperationId={operation_id}?project={project}"
    )
}

/// Generate an operation ID in UUIDv4 text format,
/// e.g. `00112233-4455-6677-8899-aabbccddeeff`.
pub fn generate_operation_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    // Version 4, RFC 4122 variant.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let h = hex.join("");
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

/// Tracks the operation ID of the most recent execute request.
///
/// The latest ID is not an inherent property of a session; it is simply
/// the ID of the last request decorated by this tracker.
#[derive(Debug, Default)]
pub struct OperationTracker {
    last: Mutex<Option<String>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `existing` if set, otherwise assign a generated ID.
    /// Either way, the returned ID becomes the latest.
    pub fn ensure(&self, existing: Option<&str>) -> String {
        let id = match existing {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let id = generate_operation_id();
                tracing::debug!("no operation_id found, setting operation_id: {id}");
                id
            }
        };
        if let Ok(mut last) = self.last.lock() {
            *last = Some(id.clone());
        }
        id
    }

    /// The operation ID of the most recent request, if any.
    pub fn latest(&self) -> Option<String> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_url() {
        let url = session_url("my-project", "us-central1", "sc-1");
        assert_eq!(
            url,
            "https://console.cloud.google.com/dataproc/interactive/us-central1/sc-1?project=my-project"
        );
    }

    #[test]
    fn test_session_details_url() {
        let url = session_details_url("my-project", "us-central1", "sc-1");
        assert_eq!(
            url,
            "https://console.cloud.google.com/dataproc/interactive/sessions/sc-1/locations/us-central1?project=my-project"
        );
    }

    #[test]
    fn test_spark_ui_url() {
        let url = spark_ui_url("my-project", "us-central1", "sc-1");
        assert!(url.ends_with("/sparkApplications/applications?project=my-project"));
    }

    #[test]
    fn test_operation_url_embeds_operation_id() {
        let url = operation_url("p", "r", "sc-1", "op-123");
        assert!(url.contains("associatedSqlOperationId=op-123"));
    }

    #[test]
    fn test_generate_operation_id_format() {
        let id = generate_operation_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 4);
        assert_eq!(parts[3].len(), 4);
        assert_eq!(parts[4].len(), 12);
        // Version nibble is always 4.
        assert!(parts[2].starts_with('4'));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_operation_id();
        let b = generate_operation_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_tracker_assigns_when_missing() {
        let tracker = OperationTracker::new();
        assert!(tracker.latest().is_none());

        let id = tracker.ensure(None);
        assert!(!id.is_empty());
        assert_eq!(tracker.latest(), Some(id));
    }

    #[test]
    fn test_tracker_keeps_existing() {
        let tracker = OperationTracker::new();
        let id = tracker.ensure(Some("caller-supplied"));
        assert_eq!(id, "caller-supplied");
        assert_eq!(tracker.latest(), Some("caller-supplied".to_string()));
    }

    #[test]
    fn test_tracker_empty_string_counts_as_missing() {
        let tracker = OperationTracker::new();
        let id = tracker.ensure(Some(""));
        assert_ne!(id, "");
    }
}
