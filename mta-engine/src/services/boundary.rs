//! Collaborator response validation
//!
//! Raw categorizer and tracker answers are checked here and converted into
//! [`CategorizedItem`] and [`TrackerOutcome`] before the pipeline sees them.
//! A wrong length or a missing field rejects the whole batch; an unknown
//! department or a drifted task text is repaired with a warning.

use tracing::warn;

use super::categorizer::RawCategorization;
use super::tracker::RawTrackerResult;
use super::CollaboratorError;
use crate::models::{CategorizedItem, Department, TrackerOutcome};
use crate::validators::normalize_text;

fn length_mismatch(what: &str, expected: usize, actual: usize) -> CollaboratorError {
    CollaboratorError::InvalidResponse(format!(
        "{} response length ({}) does not match input length ({})",
        what, actual, expected
    ))
}

fn missing_field(what: &str, index: usize, field: &str) -> CollaboratorError {
    CollaboratorError::InvalidResponse(format!(
        "{} item at index {} missing valid '{}' field",
        what, index, field
    ))
}

/// Validate categorizer output against the texts that were sent.
///
/// The returned task text is always the input text: a matching answer is
/// replaced by it verbatim and a mismatching one is replaced with a warning.
pub fn validate_categorizations(
    inputs: &[String],
    raw: Vec<RawCategorization>,
) -> Result<Vec<CategorizedItem>, CollaboratorError> {
    if raw.len() != inputs.len() {
        return Err(length_mismatch("AI", inputs.len(), raw.len()));
    }

    inputs
        .iter()
        .zip(raw)
        .enumerate()
        .map(|(index, (input, entry))| {
            let task = entry
                .task
                .filter(|t| !t.is_empty())
                .ok_or_else(|| missing_field("AI", index, "task"))?;
            let department_name = entry
                .department
                .filter(|d| !d.is_empty())
                .ok_or_else(|| missing_field("AI", index, "department"))?;

            let department = Department::parse(&department_name).unwrap_or_else(|| {
                warn!(
                    task = %task,
                    department = %department_name,
                    default = %Department::DEFAULT,
                    "Invalid department from categorizer, using default"
                );
                Department::DEFAULT
            });

            if normalize_text(&task) != normalize_text(input) {
                warn!(
                    index,
                    original = %input,
                    returned = %task,
                    "Task mismatch in categorizer response, keeping original text"
                );
            }

            Ok(CategorizedItem {
                task: input.clone(),
                department,
            })
        })
        .collect()
}

/// Validate tracker output against the items that were sent.
///
/// The reported task text is kept as returned so the pipeline can detect
/// results that do not belong to the item at the same position.
pub fn validate_tracker_results(
    items: &[CategorizedItem],
    raw: Vec<RawTrackerResult>,
) -> Result<Vec<TrackerOutcome>, CollaboratorError> {
    if raw.len() != items.len() {
        return Err(length_mismatch("Tracker", items.len(), raw.len()));
    }

    items
        .iter()
        .zip(raw)
        .enumerate()
        .map(|(index, (item, entry))| {
            let success = entry.success.ok_or_else(|| missing_field("Tracker", index, "success"))?;
            let task = entry.task.ok_or_else(|| missing_field("Tracker", index, "task"))?;

            Ok(if success {
                TrackerOutcome::Created {
                    task,
                    department: item.department,
                    task_id: entry.task_id.filter(|id| !id.is_empty()),
                }
            } else {
                TrackerOutcome::Failed {
                    task,
                    department: item.department,
                    error: entry.error.unwrap_or_else(|| "Task creation failed".to_string()),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_categorizations_pass_through() {
        let out = validate_categorizations(
            &inputs(&["Label design", "Commercial costing"]),
            vec![
                RawCategorization::new("Label design", "Design"),
                RawCategorization::new("Commercial costing", "Procurement"),
            ],
        )
        .unwrap();
        assert_eq!(out[0].department, Department::Design);
        assert_eq!(out[1].task, "Commercial costing");
    }

    #[test]
    fn test_unknown_department_uses_default() {
        let out = validate_categorizations(
            &inputs(&["Label design"]),
            vec![RawCategorization::new("Label design", "Marketing")],
        )
        .unwrap();
        assert_eq!(out[0].department, Department::Production);
    }

    #[test]
    fn test_drifted_task_is_replaced_by_input() {
        let out = validate_categorizations(
            &inputs(&["Label design"]),
            vec![RawCategorization::new("Design the label", "Design")],
        )
        .unwrap();
        assert_eq!(out[0].task, "Label design");
    }

    #[test]
    fn test_categorization_length_mismatch() {
        let err = validate_categorizations(
            &inputs(&["Label design", "Commercial costing"]),
            vec![RawCategorization::new("Label design", "Design")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not match input length"));
    }

    #[test]
    fn test_categorization_missing_fields() {
        let missing_department = RawCategorization {
            task: Some("Label design".to_string()),
            department: None,
        };
        assert!(validate_categorizations(&inputs(&["Label design"]), vec![missing_department]).is_err());
        assert!(validate_categorizations(&inputs(&["Label design"]), vec![RawCategorization::default()]).is_err());
    }

    #[test]
    fn test_tracker_results_tagged() {
        let items = vec![
            CategorizedItem {
                task: "Label design".to_string(),
                department: Department::Design,
            },
            CategorizedItem {
                task: "Commercial costing".to_string(),
                department: Department::Procurement,
            },
        ];
        let out = validate_tracker_results(
            &items,
            vec![
                RawTrackerResult::created("Label design", Some("z-1".to_string())),
                RawTrackerResult::failed("Commercial costing", "Zoho rate limit exceeded"),
            ],
        )
        .unwrap();

        assert_eq!(
            out[0],
            TrackerOutcome::Created {
                task: "Label design".to_string(),
                department: Department::Design,
                task_id: Some("z-1".to_string()),
            }
        );
        assert!(!out[1].is_success());
    }

    #[test]
    fn test_tracker_shape_errors() {
        let items = vec![CategorizedItem {
            task: "Label design".to_string(),
            department: Department::Design,
        }];
        assert!(validate_tracker_results(&items, vec![]).is_err());
        let no_success = RawTrackerResult {
            task: Some("Label design".to_string()),
            ..Default::default()
        };
        assert!(validate_tracker_results(&items, vec![no_success]).is_err());
    }

    #[test]
    fn test_tracker_task_text_kept_as_reported() {
        let items = vec![CategorizedItem {
            task: "Label design".to_string(),
            department: Department::Design,
        }];
        let out = validate_tracker_results(&items, vec![RawTrackerResult::created("Other task", None)]).unwrap();
        assert_eq!(out[0].task(), "Other task");
    }
}
