//! Login, patient search and prescription submission against the API.

use std::sync::atomic::Ordering;

use medibridge_core::prescription::{DoseSlot, TimingRelation};
use medibridge_core::{
    ApiClient, ApiError, DraftError, DrugRecord, MedibridgeError, PatientSummary,
    PrescriptionDraft, Role, SubmissionReceipt,
};

use crate::mock_api::{MOBILE, MockApi, PASSWORD, TOKEN};

/// Validates then submits, the way the clinic client does.
async fn submit(
    api: &ApiClient,
    draft: &PrescriptionDraft,
) -> Result<SubmissionReceipt, MedibridgeError> {
    let payload = draft.build_payload(MOBILE)?;
    Ok(api.submit_prescription(Some(TOKEN), &payload).await?)
}

fn paracetamol() -> DrugRecord {
    DrugRecord::new(
        "D001",
        "Paracetamol",
        Some("allopathy".to_string()),
        Some("500 mg".to_string()),
    )
}

fn patient() -> PatientSummary {
    PatientSummary {
        id: "PAT001".to_string(),
        name: "Asha Patel".to_string(),
    }
}

#[tokio::test]
async fn test_login_returns_token_and_role() {
    let api = MockApi::start().await;

    let response = api.client().login(MOBILE, PASSWORD).await.unwrap();

    assert_eq!(response.token, TOKEN);
    assert_eq!(response.role, Role::Clinic);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let api = MockApi::start().await;

    let result = api.client().login(MOBILE, "wrong").await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_patient_search_splits_listing() {
    let api = MockApi::start().await;

    let patients = api
        .client()
        .search_patients(Some(TOKEN), "asha")
        .await
        .unwrap();

    assert_eq!(patients, vec![patient()]);
}

#[tokio::test]
async fn test_submission_without_patient_never_reaches_server() {
    let api = MockApi::start().await;
    let mut draft = PrescriptionDraft::new();
    draft.add_drug(paracetamol());

    let result = submit(&api.client(), &draft).await;

    match result {
        Err(MedibridgeError::Prescription(DraftError::NoPatientSelected)) => {}
        other => panic!("expected NoPatientSelected, got {other:?}"),
    }
    assert_eq!(api.state.prescription_hits(), 0);
}

#[tokio::test]
async fn test_submission_without_drugs_never_reaches_server() {
    let api = MockApi::start().await;
    let mut draft = PrescriptionDraft::new();
    draft.select_patient(patient());

    let result = submit(&api.client(), &draft).await;

    assert!(matches!(
        result,
        Err(MedibridgeError::Prescription(DraftError::NoDrugEntries))
    ));
    assert_eq!(api.state.prescription_hits(), 0);
}

#[tokio::test]
async fn test_single_entry_submission_body() {
    let api = MockApi::start().await;
    let mut draft = PrescriptionDraft::new();
    draft.select_patient(patient());
    draft.diagnosis = "Viral fever".to_string();
    draft.vitals.bp = "120/80".to_string();
    draft.vitals.temperature = "101 F".to_string();
    let id = draft.add_drug(paracetamol());
    draft.toggle_frequency(id, DoseSlot::Night).unwrap();
    draft.toggle_frequency(id, DoseSlot::Morning).unwrap();
    draft
        .update_entry(id, |entry| {
            entry.timing_relation = TimingRelation::BeforeFood;
            entry.time_offset_minutes = 30;
            entry.dosage_quantity = "1 tablet".to_string();
            entry.duration_days = 5;
        })
        .unwrap();

    let receipt = submit(&api.client(), &draft).await.unwrap();

    assert_eq!(receipt.message, "Prescription created");
    assert!(!receipt.ai_processing_deferred);
    assert_eq!(api.state.prescription_hits(), 1);

    let bodies = api.state.prescriptions.lock();
    let body = &bodies[0];
    assert_eq!(body["patient_id"], "PAT001");
    assert_eq!(body["clinic_id"], MOBILE);
    assert_eq!(body["diagnosis"], "Viral fever");
    assert_eq!(body["vitals"]["bp"], "120/80");
    assert_eq!(body["vitals"]["temp"], "101 F");
    assert!(body["vitals"].get("hr").is_none());
    assert!(body.get("allergies").is_none());
    assert!(body["created_at"].is_i64());

    let instructions = body["instructions"].as_array().unwrap();
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0]["drug_name"], "Paracetamol");
    assert_eq!(instructions[0]["strength"], "500 mg");
    assert_eq!(instructions[0]["frequency"], "Morning, Night");
    assert_eq!(instructions[0]["timing_relation"], "Before Food");
    assert_eq!(instructions[0]["time_offset"], 30);
    assert_eq!(instructions[0]["duration_days"], 5);
}

#[tokio::test]
async fn test_deferred_ai_processing_is_still_success() {
    let api = MockApi::start().await;
    api.state.defer_ai_processing.store(true, Ordering::SeqCst);
    let mut draft = PrescriptionDraft::new();
    draft.select_patient(patient());
    draft.add_drug(paracetamol());

    let receipt = submit(&api.client(), &draft).await.unwrap();

    assert!(receipt.ai_processing_deferred);
    assert_eq!(api.state.prescriptions.lock().len(), 1);
}

#[tokio::test]
async fn test_submission_with_stale_token_is_unauthorized() {
    let api = MockApi::start().await;
    let mut draft = PrescriptionDraft::new();
    draft.select_patient(patient());
    draft.add_drug(paracetamol());
    let payload = draft.build_payload(MOBILE).unwrap();

    let result = api
        .client()
        .submit_prescription(Some("expired"), &payload)
        .await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
}
