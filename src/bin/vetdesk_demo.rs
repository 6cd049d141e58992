//! End-to-end walkthrough over the in-memory backend: seed a clinic,
//! book and complete a visit, write the clinical record, then dump the
//! audit trail. `VETDESK_SEED_DEMO=1` additionally seeds a week of
//! sample appointments for playing with listings.

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::info;

use vetdesk::config::Settings;
use vetdesk::{
    AuditStore, Claims, NewAppointment, NewClinic, NewPet, NewRecord, NewUser, Principal,
    PrincipalProvider, RecordPatch, RoleSet, TransitionAction, Vetdesk,
};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    vetdesk::telemetry::init(&settings.log_filter);

    let app = Vetdesk::in_memory();
    let admin = Principal::in_process("admin-1", RoleSet::ADMIN);

    // ── Clinic and people ──────────────────────────────────────
    let clinic = app
        .service
        .create_clinic(
            &admin,
            NewClinic {
                name: "North Paw Veterinary".into(),
                address: "14 Harbour Road".into(),
                phone: "555-0100".into(),
            },
        )
        .await?;

    for (user_id, name, roles, clinic_id) in [
        ("admin-1", "Avery Quinn", RoleSet::ADMIN, None),
        ("rec-1", "Front Desk", RoleSet::RECEPTIONIST, Some(clinic.id)),
        ("vet-1", "Dr. Imani Cole", RoleSet::VETERINARIAN, Some(clinic.id)),
        ("client-1", "Jordan Reyes", RoleSet::CLIENT, None),
    ] {
        app.service
            .register_user(
                &admin,
                NewUser {
                    user_id: user_id.into(),
                    display_name: name.into(),
                    email: format!("{user_id}@northpaw.test"),
                    roles,
                    clinic_id,
                },
            )
            .await?;
    }

    for (token, user_id, role) in [
        ("rec-token", "rec-1", "RECEPTIONIST"),
        ("vet-token", "vet-1", "VETERINARIAN"),
        ("client-token", "client-1", "CLIENT"),
    ] {
        let mut claims = Claims::new(user_id, vec![role.into()]);
        if let Some(ttl) = settings.token_ttl_secs {
            claims.exp = Some((Utc::now() + Duration::seconds(ttl)).timestamp());
        }
        app.provider.issue(token, claims).await;
    }
    let receptionist = app.provider.resolve("rec-token").await?;
    let vet = app.provider.resolve("vet-token").await?;
    let client = app.provider.resolve("client-token").await?;
    info!(
        "Resolved vet principal '{}' with clinic {:?}",
        vet.user_id, vet.clinic_id
    );

    // ── One full visit ─────────────────────────────────────────
    let pet = app
        .service
        .create_pet(
            &client,
            NewPet {
                name: "Biscuit".into(),
                species: "dog".into(),
                breed: Some("corgi".into()),
                birth_date: None,
                owner_id: None,
            },
        )
        .await?;

    let visit_at = Utc::now() + Duration::days(1);
    let appt = app
        .service
        .create_appointment(
            &receptionist,
            NewAppointment {
                clinic_id: Some(clinic.id),
                pet_id: pet.id,
                client_id: Some("client-1".into()),
                veterinarian_id: Some("vet-1".into()),
                scheduled_at: visit_at,
                reason: "limping on front left".into(),
            },
        )
        .await?;

    app.service
        .transition_appointment(&receptionist, appt.id, TransitionAction::Confirm)
        .await?;
    app.service
        .transition_appointment(&vet, appt.id, TransitionAction::Begin)
        .await?;
    app.service
        .transition_appointment(&vet, appt.id, TransitionAction::Complete)
        .await?;

    let outcome = app
        .service
        .create_record(
            &vet,
            NewRecord {
                pet_id: pet.id,
                veterinarian_id: None,
                appointment_id: Some(appt.id),
                diagnosis: "soft tissue strain".into(),
                treatment: "rest, carprofen 5 days".into(),
                vitals: Some("HR 96, temp 38.4C".into()),
            },
        )
        .await?;
    app.service
        .update_record(
            &vet,
            outcome.record.id,
            RecordPatch {
                vitals: Some("HR 88 at discharge".into()),
                ..Default::default()
            },
        )
        .await?;

    // The client sees their own row through the ownership override.
    let seen = app.service.get_record(&client, outcome.record.id).await?;
    info!("Client can read record {} for {}", seen.id, pet.name);

    // ── Optional bulk sample data ──────────────────────────────
    if settings.seed_demo_data {
        for day in 1..8 {
            let at = Utc::now() + Duration::days(day) + Duration::hours(3);
            app.service
                .create_appointment(
                    &receptionist,
                    NewAppointment {
                        clinic_id: Some(clinic.id),
                        pet_id: pet.id,
                        client_id: Some("client-1".into()),
                        veterinarian_id: Some("vet-1".into()),
                        scheduled_at: at,
                        reason: format!("follow-up day {day}"),
                    },
                )
                .await?;
        }
        info!("Seeded a week of sample appointments");
    }

    let trail = app.store.for_subject(&appt.id.to_string()).await?;
    info!(
        "Audit trail for appointment {}: {} entries",
        appt.id,
        trail.len()
    );
    for entry in trail {
        info!("  {} by {} {}", entry.action, entry.actor, entry.detail);
    }
    Ok(())
}
