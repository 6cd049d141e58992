//! Clinical record lifecycle integration tests.
//!
//! Covers the full life of a record through the service facade:
//! 1. Creation: assignment forcing, advisories, pet and link checks
//! 2. Editing: per-role gates, reassignment, archived rows read-only
//! 3. Archive and unarchive: who may, and what a vet stops seeing
//! 4. Delete: archive semantics for vets, hard delete for admins
//!
//! Run with: cargo test --test record_lifecycle

use chrono::{Duration, Utc};
use uuid::Uuid;
use vetdesk::{
    DeleteOutcome, NewAppointment, NewClinic, NewPet, NewRecord, NewUser, Principal,
    RecordFilter, RecordPatch, RoleSet, Vetdesk, VetdeskError,
};

struct World {
    app: Vetdesk,
    clinic: Uuid,
    pet: Uuid,
    appt: Uuid,
}

fn admin() -> Principal {
    Principal::in_process("admin-1", RoleSet::ADMIN)
}

fn staff(w: &World, user_id: &str, roles: RoleSet) -> Principal {
    Principal::in_process(user_id, roles).with_clinic(Some(w.clinic))
}

fn draft(pet_id: Uuid) -> NewRecord {
    NewRecord {
        pet_id,
        veterinarian_id: None,
        appointment_id: None,
        diagnosis: "otitis externa".into(),
        treatment: "ear drops, 7 days".into(),
        vitals: Some("temp 38.5C, hr 96".into()),
    }
}

/// One clinic, a receptionist and two vets on staff, one client with
/// one pet, and a confirmed appointment with vet-1 ready to link.
async fn world() -> World {
    let app = Vetdesk::in_memory();
    let root = admin();
    let clinic = app
        .service
        .create_clinic(
            &root,
            NewClinic {
                name: "North Paw".into(),
                address: "1 Main St".into(),
                phone: "555-0100".into(),
            },
        )
        .await
        .expect("create clinic")
        .id;

    for (user_id, roles) in [
        ("rec-1", RoleSet::RECEPTIONIST),
        ("vet-1", RoleSet::VETERINARIAN),
        ("vet-2", RoleSet::VETERINARIAN),
        ("client-1", RoleSet::CLIENT),
    ] {
        app.service
            .register_user(
                &root,
                NewUser {
                    user_id: user_id.into(),
                    display_name: user_id.into(),
                    email: format!("{user_id}@example.test"),
                    roles,
                    clinic_id: Some(clinic),
                },
            )
            .await
            .expect("register user");
    }

    let pet = app
        .service
        .create_pet(
            &Principal::in_process("client-1", RoleSet::CLIENT),
            NewPet {
                name: "Biscuit".into(),
                species: "dog".into(),
                breed: Some("beagle".into()),
                birth_date: None,
                owner_id: None,
            },
        )
        .await
        .expect("create pet")
        .id;

    let rec = Principal::in_process("rec-1", RoleSet::RECEPTIONIST).with_clinic(Some(clinic));
    let appt = app
        .service
        .create_appointment(
            &rec,
            NewAppointment {
                clinic_id: Some(clinic),
                pet_id: pet,
                client_id: Some("client-1".into()),
                veterinarian_id: Some("vet-1".into()),
                scheduled_at: Utc::now() + Duration::hours(1),
                reason: "ear trouble".into(),
            },
        )
        .await
        .expect("book appointment")
        .id;

    World { app, clinic, pet, appt }
}

// ── Creation ──────────────────────────────────────────────────

#[tokio::test]
async fn vet_creation_is_forced_to_self_with_advisory() {
    let w = world().await;
    let vet = staff(&w, "vet-1", RoleSet::VETERINARIAN);

    let mut wrong = draft(w.pet);
    wrong.veterinarian_id = Some("vet-2".into());
    let outcome = w.app.service.create_record(&vet, wrong).await.expect("create");
    assert_eq!(outcome.record.veterinarian_id, "vet-1");
    assert_eq!(outcome.advisories.len(), 1);
    assert_eq!(outcome.advisories[0].code, "veterinarian_assignment_overridden");

    // Naming yourself is not worth an advisory.
    let mut own = draft(w.pet);
    own.veterinarian_id = Some("vet-1".into());
    let outcome = w.app.service.create_record(&vet, own).await.expect("create");
    assert!(outcome.advisories.is_empty());
}

#[tokio::test]
async fn staff_creation_requires_a_real_veterinarian() {
    let w = world().await;
    let rec = staff(&w, "rec-1", RoleSet::RECEPTIONIST);

    let err = w.app.service.create_record(&rec, draft(w.pet)).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Validation(_)));

    // Named assignee must exist and hold VETERINARIAN.
    let mut to_client = draft(w.pet);
    to_client.veterinarian_id = Some("client-1".into());
    let err = w.app.service.create_record(&rec, to_client).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Validation(_)));

    let mut ok = draft(w.pet);
    ok.veterinarian_id = Some("vet-2".into());
    let outcome = w.app.service.create_record(&rec, ok).await.expect("create");
    assert_eq!(outcome.record.veterinarian_id, "vet-2");
    assert!(outcome.advisories.is_empty());
}

#[tokio::test]
async fn clients_never_create_records() {
    let w = world().await;
    let me = Principal::in_process("client-1", RoleSet::CLIENT);
    let err = w.app.service.create_record(&me, draft(w.pet)).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Forbidden(_)));
}

#[tokio::test]
async fn creation_validates_pet_and_appointment_link() {
    let w = world().await;
    let vet = staff(&w, "vet-1", RoleSet::VETERINARIAN);

    let err = w
        .app
        .service
        .create_record(&vet, draft(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, VetdeskError::Validation(_)));

    let mut dangling = draft(w.pet);
    dangling.appointment_id = Some(Uuid::new_v4());
    let err = w.app.service.create_record(&vet, dangling).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Validation(_)));

    // The linked appointment must be about the same pet.
    let other_pet = w
        .app
        .service
        .create_pet(
            &Principal::in_process("client-1", RoleSet::CLIENT),
            NewPet {
                name: "Waffle".into(),
                species: "cat".into(),
                breed: None,
                birth_date: None,
                owner_id: None,
            },
        )
        .await
        .expect("second pet")
        .id;
    let mut mismatched = draft(other_pet);
    mismatched.appointment_id = Some(w.appt);
    let err = w.app.service.create_record(&vet, mismatched).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Validation(_)));
}

#[tokio::test]
async fn an_appointment_carries_at_most_one_record() {
    let w = world().await;
    let vet = staff(&w, "vet-1", RoleSet::VETERINARIAN);

    let mut first = draft(w.pet);
    first.appointment_id = Some(w.appt);
    w.app.service.create_record(&vet, first).await.expect("first link");

    let mut second = draft(w.pet);
    second.appointment_id = Some(w.appt);
    let err = w.app.service.create_record(&vet, second).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Conflict(_)));
}

// ── Editing ───────────────────────────────────────────────────

#[tokio::test]
async fn vets_edit_their_own_records_only() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let vet2 = staff(&w, "vet-2", RoleSet::VETERINARIAN);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;

    let patch = RecordPatch {
        treatment: Some("ear drops, 14 days".into()),
        ..Default::default()
    };
    let updated = w
        .app
        .service
        .update_record(&vet1, record.id, patch.clone())
        .await
        .expect("own edit");
    assert_eq!(updated.record.treatment, "ear drops, 14 days");

    // Another vet's record is not even visible, let alone editable.
    let err = w.app.service.update_record(&vet2, record.id, patch).await.unwrap_err();
    assert!(matches!(err, VetdeskError::NotFound(_)));
}

#[tokio::test]
async fn receptionist_edits_and_reassigns_clinic_records() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let rec = staff(&w, "rec-1", RoleSet::RECEPTIONIST);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;

    let outcome = w
        .app
        .service
        .update_record(
            &rec,
            record.id,
            RecordPatch {
                diagnosis: Some("otitis media".into()),
                veterinarian_id: Some("vet-2".into()),
                ..Default::default()
            },
        )
        .await
        .expect("clinic edit");
    assert_eq!(outcome.record.diagnosis, "otitis media");
    assert_eq!(outcome.record.veterinarian_id, "vet-2");
    assert!(outcome.advisories.is_empty());

    // Reassignment still has to point at a veterinarian.
    let err = w
        .app
        .service
        .update_record(
            &rec,
            record.id,
            RecordPatch {
                veterinarian_id: Some("client-1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VetdeskError::Validation(_)));
}

#[tokio::test]
async fn vet_reassignment_attempt_keeps_the_assignee() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;

    let outcome = w
        .app
        .service
        .update_record(
            &vet1,
            record.id,
            RecordPatch {
                veterinarian_id: Some("vet-2".into()),
                vitals: Some("temp 39.1C".into()),
                ..Default::default()
            },
        )
        .await
        .expect("edit lands, reassignment does not");
    assert_eq!(outcome.record.veterinarian_id, "vet-1");
    assert_eq!(outcome.record.vitals.as_deref(), Some("temp 39.1C"));
    assert_eq!(outcome.advisories.len(), 1);
}

#[tokio::test]
async fn clients_read_their_pets_records_but_never_write() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let me = Principal::in_process("client-1", RoleSet::CLIENT);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;

    let seen = w.app.service.get_record(&me, record.id).await.expect("owner read");
    assert_eq!(seen.diagnosis, "otitis externa");

    let err = w
        .app
        .service
        .update_record(&me, record.id, RecordPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VetdeskError::Forbidden(_)));
    let err = w.app.service.archive_record(&me, record.id).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Forbidden(_)));
}

#[tokio::test]
async fn archived_records_are_read_only() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;
    w.app.service.archive_record(&admin(), record.id).await.expect("archive");

    let err = w
        .app
        .service
        .update_record(
            &admin(),
            record.id,
            RecordPatch {
                diagnosis: Some("revised".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VetdeskError::Validation(_)));
}

// ── Archive and unarchive ─────────────────────────────────────

#[tokio::test]
async fn archive_gate_admin_or_assigned_vet() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let rec = staff(&w, "rec-1", RoleSet::RECEPTIONIST);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;

    // Receptionists see the record but may not retire it.
    let err = w.app.service.archive_record(&rec, record.id).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Forbidden(_)));

    let archived = w.app.service.archive_record(&vet1, record.id).await.expect("own archive");
    assert_eq!(archived.active, Some(false));

    // Archiving twice is harmless; the admin still sees the row.
    let again = w.app.service.archive_record(&admin(), record.id).await.expect("re-archive");
    assert_eq!(again.active, Some(false));
}

#[tokio::test]
async fn archiving_hides_the_record_from_its_own_vet() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;
    w.app.service.archive_record(&vet1, record.id).await.expect("archive");

    // Gone from the vet's world entirely, so even unarchive reads 404.
    let err = w.app.service.get_record(&vet1, record.id).await.unwrap_err();
    assert!(matches!(err, VetdeskError::NotFound(_)));
    let err = w.app.service.unarchive_record(&vet1, record.id).await.unwrap_err();
    assert!(matches!(err, VetdeskError::NotFound(_)));

    // The admin restores it and the vet gets it back.
    let restored = w.app.service.unarchive_record(&admin(), record.id).await.expect("restore");
    assert_eq!(restored.active, Some(true));
    assert!(w.app.service.get_record(&vet1, record.id).await.is_ok());
}

#[tokio::test]
async fn unarchive_is_admin_only_even_in_scope() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let rec = staff(&w, "rec-1", RoleSet::RECEPTIONIST);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;
    w.app.service.archive_record(&admin(), record.id).await.expect("archive");

    // The receptionist's clinic scope still admits archived rows, so
    // this fails on the gate rather than on visibility.
    let err = w.app.service.unarchive_record(&rec, record.id).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Forbidden(_)));
}

#[tokio::test]
async fn include_archived_filter_trims_staff_listings() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let active = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;
    let archived = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;
    w.app.service.archive_record(&admin(), archived.id).await.expect("archive");

    let all = w
        .app
        .service
        .list_records(&admin(), RecordFilter::default())
        .await
        .expect("list");
    assert_eq!(all.len(), 2);

    let live_only = w
        .app
        .service
        .list_records(
            &admin(),
            RecordFilter {
                include_archived: false,
                ..Default::default()
            },
        )
        .await
        .expect("list");
    let ids: Vec<Uuid> = live_only.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![active.id]);

    // A vet's scope already excludes archived rows; the filter is moot.
    let mine = w
        .app
        .service
        .list_records(&vet1, RecordFilter::default())
        .await
        .expect("list");
    let ids: Vec<Uuid> = mine.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![active.id]);
}

// ── Delete ────────────────────────────────────────────────────

#[tokio::test]
async fn vet_delete_means_archive() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;

    let outcome = w.app.service.delete_record(&vet1, record.id).await.expect("delete");
    let DeleteOutcome::Archived(row) = outcome else {
        panic!("vet delete must archive");
    };
    assert_eq!(row.active, Some(false));

    // Still on file for the clinic.
    assert!(w.app.service.get_record(&admin(), record.id).await.is_ok());
}

#[tokio::test]
async fn vet_cannot_delete_a_colleagues_record() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let vet2 = staff(&w, "vet-2", RoleSet::VETERINARIAN);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;

    let err = w.app.service.delete_record(&vet2, record.id).await.unwrap_err();
    assert!(matches!(err, VetdeskError::NotFound(_)));
}

#[tokio::test]
async fn receptionists_never_delete() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let rec = staff(&w, "rec-1", RoleSet::RECEPTIONIST);
    let record = w
        .app
        .service
        .create_record(&vet1, draft(w.pet))
        .await
        .expect("create")
        .record;

    let err = w.app.service.delete_record(&rec, record.id).await.unwrap_err();
    assert!(matches!(err, VetdeskError::Forbidden(_)));
}

#[tokio::test]
async fn admin_delete_unlinks_then_removes() {
    let w = world().await;
    let vet1 = staff(&w, "vet-1", RoleSet::VETERINARIAN);
    let mut linked = draft(w.pet);
    linked.appointment_id = Some(w.appt);
    let record = w
        .app
        .service
        .create_record(&vet1, linked)
        .await
        .expect("create")
        .record;

    let outcome = w.app.service.delete_record(&admin(), record.id).await.expect("delete");
    assert!(matches!(outcome, DeleteOutcome::Deleted));
    let err = w.app.service.get_record(&admin(), record.id).await.unwrap_err();
    assert!(matches!(err, VetdeskError::NotFound(_)));

    // The appointment link died with the row, so it is free again.
    let mut relinked = draft(w.pet);
    relinked.appointment_id = Some(w.appt);
    w.app
        .service
        .create_record(&vet1, relinked)
        .await
        .expect("appointment is linkable again");
}
