//! Prescription drafting and request payload construction.
//!
//! A [`PrescriptionDraft`] is the in-progress state of one consultation. It is
//! only checked when turned into a [`PrescriptionPayload`] for submission.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::PatientSummary;
use crate::drug::DrugRecord;

/// Time-of-day slots a dose can be scheduled in, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseSlot {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DoseSlot {
    pub const ALL: [DoseSlot; 4] = [
        DoseSlot::Morning,
        DoseSlot::Afternoon,
        DoseSlot::Evening,
        DoseSlot::Night,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DoseSlot::Morning => "Morning",
            DoseSlot::Afternoon => "Afternoon",
            DoseSlot::Evening => "Evening",
            DoseSlot::Night => "Night",
        }
    }
}

impl std::str::FromStr for DoseSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DoseSlot::ALL
            .into_iter()
            .find(|slot| slot.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid dose slot: {s}"))
    }
}

/// Which slots a drug is taken in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyFlags {
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub afternoon: bool,
    #[serde(default)]
    pub evening: bool,
    #[serde(default)]
    pub night: bool,
}

impl FrequencyFlags {
    pub fn is_set(&self, slot: DoseSlot) -> bool {
        match slot {
            DoseSlot::Morning => self.morning,
            DoseSlot::Afternoon => self.afternoon,
            DoseSlot::Evening => self.evening,
            DoseSlot::Night => self.night,
        }
    }

    pub fn toggle(&mut self, slot: DoseSlot) {
        let flag = match slot {
            DoseSlot::Morning => &mut self.morning,
            DoseSlot::Afternoon => &mut self.afternoon,
            DoseSlot::Evening => &mut self.evening,
            DoseSlot::Night => &mut self.night,
        };
        *flag = !*flag;
    }

    /// Set slots joined as `"Morning, Night"`, always in day order.
    pub fn to_wire(&self) -> String {
        DoseSlot::ALL
            .into_iter()
            .filter(|slot| self.is_set(*slot))
            .map(DoseSlot::label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// How a dose relates to meals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingRelation {
    #[default]
    #[serde(rename = "After Food")]
    AfterFood,
    #[serde(rename = "Before Food")]
    BeforeFood,
    #[serde(rename = "With Food")]
    WithFood,
    #[serde(rename = "Empty Stomach")]
    EmptyStomach,
}

impl TimingRelation {
    pub fn label(self) -> &'static str {
        match self {
            TimingRelation::AfterFood => "After Food",
            TimingRelation::BeforeFood => "Before Food",
            TimingRelation::WithFood => "With Food",
            TimingRelation::EmptyStomach => "Empty Stomach",
        }
    }
}

/// One drug line of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugEntry {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub drug: DrugRecord,
    #[serde(default)]
    pub frequency: FrequencyFlags,
    #[serde(default)]
    pub timing_relation: TimingRelation,
    #[serde(default)]
    pub time_offset_minutes: u32,
    #[serde(default)]
    pub dosage_quantity: String,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub patient_note: String,
}

impl DrugEntry {
    pub fn new(drug: DrugRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            drug,
            frequency: FrequencyFlags::default(),
            timing_relation: TimingRelation::default(),
            time_offset_minutes: 0,
            dosage_quantity: String::new(),
            duration_days: 0,
            patient_note: String::new(),
        }
    }

    fn to_instruction(&self) -> DosageInstruction {
        DosageInstruction {
            drug_name: self.drug.name().to_string(),
            drug_type: self.drug.category().unwrap_or_default().to_string(),
            strength: self.drug.strength().unwrap_or_default().to_string(),
            frequency: self.frequency.to_wire(),
            timing_relation: self.timing_relation.label().to_string(),
            time_offset: self.time_offset_minutes,
            dosage_quantity: self.dosage_quantity.clone(),
            duration_days: self.duration_days,
            patient_note: self.patient_note.clone(),
        }
    }
}

/// Vital signs captured during the consultation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default)]
    pub bp: String,
    #[serde(default)]
    pub heart_rate: String,
    #[serde(default)]
    pub temperature: String,
}

impl Vitals {
    /// Wire form: keys `bp`, `hr` and `temp`, blank readings left out.
    fn to_map(&self) -> BTreeMap<String, String> {
        [
            ("bp", &self.bp),
            ("hr", &self.heart_rate),
            ("temp", &self.temperature),
        ]
        .into_iter()
        .map(|(key, value)| (key, value.trim()))
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }
}

/// Letterhead details printed on the prescription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicTemplate {
    #[serde(default)]
    pub clinic_name: String,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub doctor_specialty: String,
    #[serde(default)]
    pub signature_url: String,
}

/// Submission-time validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Please select a patient")]
    NoPatientSelected,

    #[error("Please add at least one drug")]
    NoDrugEntries,

    #[error("No drug entry with id {id}")]
    EntryNotFound { id: Uuid },
}

/// In-progress consultation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionDraft {
    #[serde(default)]
    pub patient: Option<PatientSummary>,
    #[serde(default)]
    pub clinic: ClinicTemplate,
    #[serde(default)]
    pub vitals: Vitals,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    entries: Vec<DrugEntry>,
}

impl PrescriptionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_patient(&mut self, patient: PatientSummary) {
        self.patient = Some(patient);
    }

    pub fn clear_patient(&mut self) {
        self.patient = None;
    }

    pub fn entries(&self) -> &[DrugEntry] {
        &self.entries
    }

    /// Appends a drug with default dosing and returns the new entry's id.
    pub fn add_drug(&mut self, drug: DrugRecord) -> Uuid {
        let entry = DrugEntry::new(drug);
        let id = entry.id;
        self.entries.push(entry);
        id
    }

    /// Applies `update` to the entry with the given id.
    ///
    /// # Errors
    ///
    /// - `DraftError::EntryNotFound` - If no entry has that id
    pub fn update_entry(
        &mut self,
        id: Uuid,
        update: impl FnOnce(&mut DrugEntry),
    ) -> Result<(), DraftError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(DraftError::EntryNotFound { id })?;
        update(entry);
        Ok(())
    }

    /// Flips one time-of-day flag on an entry.
    ///
    /// # Errors
    ///
    /// - `DraftError::EntryNotFound` - If no entry has that id
    pub fn toggle_frequency(&mut self, id: Uuid, slot: DoseSlot) -> Result<(), DraftError> {
        self.update_entry(id, |entry| entry.frequency.toggle(slot))
    }

    /// Removes an entry, preserving the order of the rest.
    ///
    /// # Errors
    ///
    /// - `DraftError::EntryNotFound` - If no entry has that id
    pub fn remove_entry(&mut self, id: Uuid) -> Result<DrugEntry, DraftError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(DraftError::EntryNotFound { id })?;
        Ok(self.entries.remove(index))
    }

    /// Clears the consultation after a submission. Patient, clinic template
    /// and vitals are kept.
    pub fn reset_consultation(&mut self) {
        self.entries.clear();
        self.diagnosis.clear();
        self.allergies.clear();
    }

    /// Validates the draft and builds the request body.
    ///
    /// # Errors
    ///
    /// - `DraftError::NoPatientSelected` - If no patient has been selected
    /// - `DraftError::NoDrugEntries` - If the draft has no drug entries
    pub fn build_payload(&self, clinic_id: &str) -> Result<PrescriptionPayload, DraftError> {
        let patient = self.patient.as_ref().ok_or(DraftError::NoPatientSelected)?;

        if self.entries.is_empty() {
            return Err(DraftError::NoDrugEntries);
        }

        Ok(PrescriptionPayload {
            patient_id: patient.id.clone(),
            clinic_id: clinic_id.to_string(),
            diagnosis: self.diagnosis.trim().to_string(),
            vitals: self.vitals.to_map(),
            allergies: self.allergies.trim().to_string(),
            instructions: self.entries.iter().map(DrugEntry::to_instruction).collect(),
            created_at: chrono::Utc::now().timestamp(),
        })
    }
}

/// One instruction object of the submission body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosageInstruction {
    pub drug_name: String,
    pub drug_type: String,
    pub strength: String,
    pub frequency: String,
    pub timing_relation: String,
    pub time_offset: u32,
    pub dosage_quantity: String,
    pub duration_days: u32,
    pub patient_note: String,
}

/// Request body for `POST /v1/clinic/prescriptions/new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionPayload {
    pub patient_id: String,
    pub clinic_id: String,
    pub diagnosis: String,
    pub vitals: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub allergies: String,
    pub instructions: Vec<DosageInstruction>,
    pub created_at: i64,
}
