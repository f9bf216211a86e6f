use serde::{Deserialize, Serialize};

use crate::medications::MedicationError;

/// One medication on the session's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl MedicationEntry {
    /// Build an entry from raw form input. Fields are trimmed; blank
    /// optional fields become `None`.
    pub fn new(
        name: &str,
        dosage: Option<&str>,
        time: Option<&str>,
    ) -> Result<Self, MedicationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MedicationError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            dosage: non_blank(dosage),
            time: non_blank(time),
        })
    }

    /// `Name (dosage)` form used when listing medications in a prompt.
    pub fn prompt_label(&self) -> String {
        format!(
            "{} ({})",
            self.name,
            self.dosage.as_deref().unwrap_or("dose unknown")
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Suggested starting plan for a condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationPlan {
    pub medications: Vec<MedicationEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_and_drops_blank_fields() {
        let entry = MedicationEntry::new("  Ibuprofen ", Some("  "), Some(" 8:00 PM ")).unwrap();
        assert_eq!(entry.name, "Ibuprofen");
        assert_eq!(entry.dosage, None);
        assert_eq!(entry.time.as_deref(), Some("8:00 PM"));
    }

    #[test]
    fn new_rejects_empty_name() {
        assert!(matches!(
            MedicationEntry::new("   ", Some("5mg"), None),
            Err(MedicationError::EmptyName)
        ));
    }

    #[test]
    fn prompt_label_marks_unknown_dose() {
        let known = MedicationEntry::new("Warfarin", Some("5mg"), None).unwrap();
        let unknown = MedicationEntry::new("Aspirin", None, None).unwrap();
        assert_eq!(known.prompt_label(), "Warfarin (5mg)");
        assert_eq!(unknown.prompt_label(), "Aspirin (dose unknown)");
    }

    #[test]
    fn optional_fields_skip_when_absent() {
        let entry = MedicationEntry::new("Aspirin", None, None).unwrap();
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"Aspirin"}"#);
    }
}
