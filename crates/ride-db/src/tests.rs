use super::*;
use dotenvy::dotenv;
use std::env;

async fn establish_store() -> Store {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let config = Config {
        db_url: database_url.clone(),
        max_open: 4,
        max_idle: 2,
        max_lifetime: None,
        max_idle_lifetime: None,
        timeout_for_get: Duration::from_secs(5),
    };
    create(&config)
        .await
        .unwrap_or_else(|err| panic!("Error connecting to {}: {err}", database_url))
}

fn unique_suffix() -> String {
    jiff::Timestamp::now().as_nanosecond().to_string()
}

fn new_account(suffix: &str, role: AccountRole) -> NewAccount {
    NewAccount {
        profile: Profile {
            username: format!("u{}", &suffix[suffix.len() - 12..]),
            email: format!("{suffix}@example.com"),
            first_name: "Test".to_owned(),
            last_name: "Rider".to_owned(),
            phone: format!("555-{suffix}"),
        },
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_owned(),
        role,
    }
}

fn details() -> ReservationDetails {
    ReservationDetails {
        passenger_name: "Alice".to_owned(),
        passenger_phone: "555-0100".to_owned(),
        passenger_email: None,
        vehicle_class: VehicleClass::Sedan,
        pickup_date: jiff::civil::date(2026, 10, 14),
        pickup_time: jiff::civil::time(14, 30, 0, 0),
        pickup: Address {
            street: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            ..Default::default()
        },
        dropoff: Address {
            street: "2 Airport Rd".to_owned(),
            city: "Springfield".to_owned(),
            region: Some("IL".to_owned()),
            ..Default::default()
        },
        notes: Some("two bags".to_owned()),
    }
}

mod account {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a migrated database at DATABASE_URL"]
    async fn it_registers_then_finds_the_account_by_case_insensitive_username() {
        let store = establish_store().await;
        let suffix = unique_suffix();
        let created = store
            .register_account(new_account(&suffix, AccountRole::Standard))
            .await
            .expect("should register the account");
        let loaded = store
            .load_account_by_username(&created.profile.username.to_uppercase())
            .await
            .expect("should query by username")
            .expect("should find the account");
        assert_eq!(created, loaded, "loaded account should match the registered account");
        assert_eq!(loaded.role, AccountRole::Standard, "role should survive the round trip");
    }

    #[tokio::test]
    #[ignore = "requires a migrated database at DATABASE_URL"]
    async fn it_reports_a_second_username_as_a_duplicate() {
        let store = establish_store().await;
        let suffix = unique_suffix();
        let first = store
            .register_account(new_account(&suffix, AccountRole::Standard))
            .await
            .expect("should register the first account");
        let mut second = new_account(&format!("{suffix}9"), AccountRole::Standard);
        second.profile.username = first.profile.username.clone();
        assert!(
            matches!(
                store.register_account(second).await,
                Err(Error::Duplicate(IdentityField::Username))
            ),
            "second registration should violate the username index"
        );
        assert!(store
            .identity_taken(IdentityField::Username, &first.profile.username, None, None)
            .await
            .expect("should query"));
        assert!(!store
            .identity_taken(
                IdentityField::Username,
                &first.profile.username,
                None,
                Some(first.id)
            )
            .await
            .expect("should query"));
    }
}

mod reservation {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a migrated database at DATABASE_URL"]
    async fn it_assigns_ids_from_the_reserved_range_and_updates_every_column() {
        let store = establish_store().await;
        let owner = store
            .register_account(new_account(&unique_suffix(), AccountRole::Standard))
            .await
            .expect("should register the owner");
        let created = store
            .insert_reservation(owner.id, details())
            .await
            .expect("should insert the reservation");
        assert!(created.id > 10000, "reservation ids should start at 10001");
        assert_eq!(created.details, details(), "details should round trip");

        let mut changed = details();
        changed.notes = None;
        changed.vehicle_class = VehicleClass::SprinterVan;
        let updated = store
            .update_reservation(created.id, changed.clone())
            .await
            .expect("should update")
            .expect("reservation should exist");
        assert_eq!(updated.details, changed, "all columns should be replaced");
        assert!(store
            .list_reservations_for_account(owner.id)
            .await
            .expect("should list")
            .iter()
            .any(|r| r.id == created.id));
    }

    #[tokio::test]
    #[ignore = "requires a migrated database at DATABASE_URL"]
    async fn it_returns_none_for_ids_below_the_reserved_range() {
        let store = establish_store().await;
        assert!(store
            .load_reservation_by_id(1)
            .await
            .expect("should query")
            .is_none());
    }
}
