//! Sensor pairing across boots and sensor replacement.
//!
//! Run with: cargo test --package fingerbell-engine --test pairing_flows

mod common;

use common::{Rig, slot};
use fingerbell_core::constants::{PAIRING_CODE_KEY, PAIRING_NAMESPACE, PAIRING_VALID_KEY};
use fingerbell_engine::pairing::{
    PAIRING_FAILED_TEXT, PAIRING_INVALID_TEXT, PAIRING_MISMATCH_TEXT, PAIRING_SUCCESS_TEXT,
    PAIRING_UNREADABLE_TEXT,
};
use fingerbell_engine::{PairingStatus, Severity};
use fingerbell_hardware::SensorError;
use fingerbell_hardware::mock::Operation;
use fingerbell_storage::PreferenceStore;

async fn stored_code(rig: &Rig) -> Option<String> {
    rig.store
        .get(PAIRING_NAMESPACE, PAIRING_CODE_KEY)
        .await
        .unwrap()
}

async fn stored_valid(rig: &Rig) -> Option<bool> {
    rig.store
        .get_bool(PAIRING_NAMESPACE, PAIRING_VALID_KEY)
        .await
        .unwrap()
}

fn sensor_code(rig: &Rig) -> String {
    let page = rig.handle.notepad(0).unwrap();
    let text = String::from_utf8_lossy(&page);
    text.trim_end_matches('\0').to_string()
}

#[tokio::test(start_paused = true)]
async fn test_first_boot_pairs_sensor() {
    let rig = Rig::ready().await;

    let code = stored_code(&rig).await.unwrap();
    assert_eq!(code.len(), 32);
    assert_eq!(sensor_code(&rig), code);
    assert_eq!(stored_valid(&rig).await, Some(true));

    assert!(rig.controller.is_paired());
    let observations = rig.controller.observations();
    assert!(observations.pairing_valid);
    assert_eq!(observations.pairing_warning, PAIRING_SUCCESS_TEXT);
    assert_eq!(observations.warning_severity, Severity::Info);
    assert_eq!(rig.handle.calls(Operation::WriteNotepad), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reboot_with_same_sensor_is_valid() {
    let rig = Rig::ready().await;
    let code = stored_code(&rig).await.unwrap();

    let mut rig = rig.reboot();
    rig.controller.setup().await.unwrap();

    assert!(rig.controller.is_paired());
    assert_eq!(rig.controller.check_pairing().await.unwrap(), PairingStatus::Valid);
    assert_eq!(stored_code(&rig).await, Some(code));
    assert_eq!(rig.handle.calls(Operation::WriteNotepad), 1);
    assert_eq!(rig.controller.observations().pairing_warning, "");
}

#[tokio::test(start_paused = true)]
async fn test_replaced_sensor_stays_untrusted_until_repaired() {
    let mut rig = Rig::ready().await;
    let code = stored_code(&rig).await.unwrap();

    rig.handle.swap_sensor([]);
    let status = rig.controller.check_pairing().await.unwrap();

    assert_eq!(status, PairingStatus::Mismatch);
    assert!(!status.is_trusted());
    assert!(!rig.controller.is_paired());
    assert_eq!(stored_valid(&rig).await, Some(false));
    let observations = rig.controller.observations();
    assert!(!observations.pairing_valid);
    assert_eq!(observations.pairing_warning, PAIRING_MISMATCH_TEXT);
    assert_eq!(observations.warning_severity, Severity::Critical);

    // Putting the original secret back does not restore trust.
    rig.handle.write_notepad_raw(0, code.as_bytes());
    assert_eq!(
        rig.controller.check_pairing().await.unwrap(),
        PairingStatus::PreviouslyInvalidated
    );
    assert_eq!(
        rig.controller.observations().pairing_warning,
        PAIRING_INVALID_TEXT
    );

    let mut rig = rig.reboot();
    rig.controller.setup().await.unwrap();
    assert!(!rig.controller.is_paired());
    assert!(!rig.controller.observations().pairing_valid);
    assert_eq!(
        rig.controller.check_pairing().await.unwrap(),
        PairingStatus::PreviouslyInvalidated
    );

    rig.controller.pair().await.unwrap();

    assert!(rig.controller.is_paired());
    assert_ne!(stored_code(&rig).await.unwrap(), code);
    assert_eq!(sensor_code(&rig), stored_code(&rig).await.unwrap());
    assert_eq!(stored_valid(&rig).await, Some(true));
    assert_eq!(rig.controller.check_pairing().await.unwrap(), PairingStatus::Valid);
}

#[tokio::test(start_paused = true)]
async fn test_matches_still_reported_while_untrusted() {
    let mut rig = Rig::ready().await;
    rig.handle.swap_sensor([(slot(2), 77)]);
    rig.controller.check_pairing().await.unwrap();
    assert!(!rig.controller.is_paired());

    rig.handle.place_finger(77);
    let result = rig.next_tick().await.unwrap();

    assert!(result.is_identified());
    assert_eq!(result.id(), 2);
    assert_eq!(rig.controller.observations().matched_id, 2);
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_at_first_boot_leaves_unpaired() {
    let mut rig = Rig::new();
    rig.handle
        .fail_next(Operation::WriteNotepad, SensorError::communication("nack"));

    rig.controller.setup().await.unwrap();

    assert!(!rig.controller.is_paired());
    assert!(rig.controller.pairing_record().is_first_boot());
    assert_eq!(stored_code(&rig).await, None);
    let observations = rig.controller.observations();
    assert_eq!(observations.status, "Ready");
    assert_eq!(observations.pairing_warning, PAIRING_FAILED_TEXT);
    assert_eq!(observations.warning_severity, Severity::Warning);

    // Still a first boot, so the next check pairs.
    assert_eq!(
        rig.controller.check_pairing().await.unwrap(),
        PairingStatus::Paired
    );
    assert!(rig.controller.is_paired());
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_sensor_changes_nothing() {
    let mut rig = Rig::ready().await;
    rig.handle
        .fail_next(Operation::ReadNotepad, SensorError::communication("crc"));

    assert_eq!(
        rig.controller.check_pairing().await.unwrap(),
        PairingStatus::Unreadable
    );
    assert!(rig.controller.is_paired());
    assert_eq!(stored_valid(&rig).await, Some(true));
    assert_eq!(
        rig.controller.observations().pairing_warning,
        PAIRING_UNREADABLE_TEXT
    );
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_sensor_at_boot_reports_trusted_record() {
    let rig = Rig::ready().await;

    let mut rig = rig.reboot();
    rig.handle
        .fail_next(Operation::ReadNotepad, SensorError::communication("blip"));
    rig.controller.setup().await.unwrap();

    assert!(rig.controller.is_paired());
    let observations = rig.controller.observations();
    assert_eq!(observations.pairing_valid, rig.controller.is_paired());
    assert_eq!(observations.pairing_warning, PAIRING_UNREADABLE_TEXT);
    assert_eq!(observations.warning_severity, Severity::Warning);
    assert_eq!(stored_valid(&rig).await, Some(true));

    // The next successful read clears the warning.
    assert_eq!(rig.controller.check_pairing().await.unwrap(), PairingStatus::Valid);
    assert_eq!(rig.controller.observations().pairing_warning, "");
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_stored_code_is_not_a_first_boot() {
    let mut rig = Rig::new();
    rig.store
        .put(PAIRING_NAMESPACE, PAIRING_CODE_KEY, "not a pairing code")
        .await
        .unwrap();

    rig.controller.setup().await.unwrap();

    assert!(!rig.controller.is_paired());
    assert_eq!(rig.handle.calls(Operation::WriteNotepad), 0);
    assert_eq!(
        rig.controller.observations().pairing_warning,
        PAIRING_INVALID_TEXT
    );

    rig.controller.pair().await.unwrap();
    assert!(rig.controller.is_paired());
}
