use serde::{Deserialize, Serialize};
use std::fmt;

/// A rejected file handed to the remediation worker.
///
/// Built once per discovered file and consumed once; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationTask {
    /// Identifier of the task: the rejected file's full path.
    pub name: String,
    /// Where the rejected file lives.
    pub rejected_location: String,
    /// Where the remediated file is uploaded to.
    pub destination_location: String,
}

impl RemediationTask {
    /// Build a task for `location`, deriving the destination by swapping the
    /// reject segment for the in segment.
    pub fn for_rejected_file(location: &str, reject_segment: &str, in_segment: &str) -> Self {
        Self {
            name: location.to_string(),
            rejected_location: location.to_string(),
            destination_location: substitute_segment(location, reject_segment, in_segment),
        }
    }

    /// Path of the marker object claiming this task.
    pub fn marker_location(&self, marker_suffix: &str) -> String {
        format!("{}{}", self.rejected_location, marker_suffix)
    }
}

impl fmt::Display for RemediationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.rejected_location, self.destination_location)
    }
}

/// Replace the first `/from/` path segment in `location` with `/to/`.
///
/// Falls back to replacing the first raw occurrence of `from` when no
/// slash-bounded segment matches.
pub(crate) fn substitute_segment(location: &str, from: &str, to: &str) -> String {
    let bounded_from = format!("/{}/", from);
    if location.contains(&bounded_from) {
        return location.replacen(&bounded_from, &format!("/{}/", to), 1);
    }
    location.replacen(from, to, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_swaps_reject_for_in() {
        let task = RemediationTask::for_rejected_file(
            "gs://bucket/721211/reject/batch/x.csv",
            "reject",
            "in",
        );
        assert_eq!(task.name, "gs://bucket/721211/reject/batch/x.csv");
        assert_eq!(task.rejected_location, task.name);
        assert_eq!(
            task.destination_location,
            "gs://bucket/721211/in/batch/x.csv"
        );
    }

    #[test]
    fn only_the_path_segment_is_replaced() {
        let task = RemediationTask::for_rejected_file(
            "gs://reject-bucket/t/reject/rejected.csv",
            "reject",
            "in",
        );
        assert_eq!(
            task.destination_location,
            "gs://reject-bucket/t/in/rejected.csv"
        );
    }

    #[test]
    fn falls_back_to_raw_replacement() {
        assert_eq!(substitute_segment("reject/x.csv", "reject", "in"), "in/x.csv");
    }

    #[test]
    fn marker_location_appends_suffix() {
        let task = RemediationTask::for_rejected_file("/data/t/reject/a.csv", "reject", "in");
        assert_eq!(task.marker_location(".scanned"), "/data/t/reject/a.csv.scanned");
    }
}
