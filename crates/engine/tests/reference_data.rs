use chrono::{TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    CardBrand, CategoryKind, CategoryUpdate, Engine, EngineError, NewAccount, NewCategory,
    NewCreditCardInfo,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn new_account(name: &str, kind: &str) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        initial_balance: 0.0,
        currency: "usd".to_string(),
        color: "#336699".to_string(),
        icon: "bank".to_string(),
        kind: kind.to_string(),
    }
}

fn card_details(last_four: &str) -> NewCreditCardInfo {
    NewCreditCardInfo {
        last_four: last_four.to_string(),
        name: "Alice M".to_string(),
        brand: "mastercard".to_string(),
        closing_date: Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).single(),
        due_date: Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).single(),
    }
}

#[tokio::test]
async fn creator_becomes_member_of_new_tenant() {
    let (engine, _db) = engine_with_db().await;

    let home = engine.new_tenant("Household", "alice").await.unwrap();
    let work = engine.new_tenant("Work", "bob").await.unwrap();

    let alice = engine.list_user_tenants("alice").await.unwrap();
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].tenant_id, home.id);

    engine.add_tenant_member(work.id, "alice").await.unwrap();
    engine.add_tenant_member(work.id, "alice").await.unwrap();
    let tenants: Vec<_> = engine
        .list_user_tenants("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|membership| membership.tenant_id)
        .collect();
    assert_eq!(tenants, vec![home.id, work.id]);

    engine.remove_tenant_member(work.id, "alice").await.unwrap();
    assert_eq!(engine.list_user_tenants("alice").await.unwrap().len(), 1);

    engine.add_tenant_member(work.id, "alice").await.unwrap();
    assert_eq!(engine.list_user_tenants("alice").await.unwrap().len(), 2);
}

#[tokio::test]
async fn tenant_needs_a_creator_and_members_need_a_tenant() {
    let (engine, _db) = engine_with_db().await;

    assert_eq!(
        engine.new_tenant("Household", " ").await.unwrap_err(),
        EngineError::Forbidden("user id is required".to_string())
    );
    assert!(matches!(
        engine.add_tenant_member(Uuid::new_v4(), "alice").await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.remove_tenant_member(Uuid::new_v4(), "alice").await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn account_update_replaces_fields_and_revalidates() {
    let (engine, _db) = engine_with_db().await;
    let tenant = engine.new_tenant("Household", "alice").await.unwrap();
    let account = engine
        .new_account(tenant.id, "alice", &new_account("Checking", "bank"))
        .await
        .unwrap();

    let updated = engine
        .update_account(
            tenant.id,
            "bob",
            account.id,
            &NewAccount {
                initial_balance: 150.25,
                currency: "eur".to_string(),
                ..new_account("Main checking", "bank")
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Main checking");
    assert_eq!(updated.initial_balance.cents(), 15025);
    assert_eq!(updated.currency.code(), "EUR");
    assert_eq!(updated.updated_by, "bob");
    assert_eq!(updated.created_by, "alice");

    let Err(EngineError::Validation(errors)) = engine
        .update_account(tenant.id, "bob", account.id, &new_account("", "vault"))
        .await
    else {
        panic!("expected validation error");
    };
    assert_eq!(errors.get("name"), Some("name is required"));
    assert_eq!(errors.get("type"), Some("invalid account type"));

    let other = engine.new_tenant("Other", "carol").await.unwrap();
    assert!(matches!(
        engine
            .update_account(other.id, "carol", account.id, &new_account("Mine", "bank"))
            .await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn category_update_keeps_its_type() {
    let (engine, _db) = engine_with_db().await;
    let tenant = engine.new_tenant("Household", "alice").await.unwrap();
    let travel = engine
        .new_category(
            tenant.id,
            "alice",
            &NewCategory {
                name: "Travel".to_string(),
                kind: "expense".to_string(),
                ..NewCategory::default()
            },
        )
        .await
        .unwrap();
    let flights = engine
        .new_category(
            tenant.id,
            "alice",
            &NewCategory {
                name: "Flights".to_string(),
                kind: "expense".to_string(),
                ..NewCategory::default()
            },
        )
        .await
        .unwrap();

    let updated = engine
        .update_category(
            tenant.id,
            "alice",
            flights.id,
            &CategoryUpdate {
                name: "Air travel".to_string(),
                parent_category_id: Some(travel.id),
                color: "#0000ff".to_string(),
                icon: "plane".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Air travel");
    assert_eq!(updated.parent_category_id, Some(travel.id));
    assert_eq!(updated.kind, CategoryKind::Expense);
    let stored = engine.category(tenant.id, flights.id).await.unwrap();
    assert_eq!(stored.name, "Air travel");
    assert_eq!(stored.parent_category_id, Some(travel.id));

    let Err(EngineError::Validation(errors)) = engine
        .update_category(
            tenant.id,
            "alice",
            travel.id,
            &CategoryUpdate {
                name: "Travel".to_string(),
                parent_category_id: Some(travel.id),
                ..CategoryUpdate::default()
            },
        )
        .await
    else {
        panic!("expected validation error");
    };
    assert_eq!(
        errors.get("parent_category_id"),
        Some("a category cannot be its own parent")
    );

    assert!(matches!(
        engine
            .update_category(
                tenant.id,
                "alice",
                flights.id,
                &CategoryUpdate {
                    name: "Air travel".to_string(),
                    parent_category_id: Some(Uuid::new_v4()),
                    ..CategoryUpdate::default()
                },
            )
            .await,
        Err(EngineError::Reference(_))
    ));
}

#[tokio::test]
async fn tag_rename_is_tenant_scoped() {
    let (engine, _db) = engine_with_db().await;
    let tenant = engine.new_tenant("Household", "alice").await.unwrap();
    let other = engine.new_tenant("Other", "bob").await.unwrap();
    let tag = engine.new_tag(tenant.id, "alice", "trvel").await.unwrap();

    let renamed = engine
        .update_tag(tenant.id, "alice", tag.id, " travel ")
        .await
        .unwrap();
    assert_eq!(renamed.name, "travel");
    let names: Vec<_> = engine
        .list_tags(tenant.id)
        .await
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    assert_eq!(names, vec!["travel"]);

    let Err(EngineError::Validation(errors)) =
        engine.update_tag(tenant.id, "alice", tag.id, "").await
    else {
        panic!("expected validation error");
    };
    assert_eq!(errors.get("name"), Some("name is required"));

    assert!(matches!(
        engine.update_tag(other.id, "bob", tag.id, "mine").await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn credit_card_info_is_upserted_per_account() {
    let (engine, _db) = engine_with_db().await;
    let tenant = engine.new_tenant("Household", "alice").await.unwrap();
    let card = engine
        .new_account(tenant.id, "alice", &new_account("Visa", "credit_card"))
        .await
        .unwrap();

    assert!(matches!(
        engine.credit_card_info(tenant.id, card.id).await,
        Err(EngineError::KeyNotFound(_))
    ));

    let first = engine
        .upsert_credit_card_info(tenant.id, "alice", card.id, &card_details("1234"))
        .await
        .unwrap();
    let second = engine
        .upsert_credit_card_info(tenant.id, "bob", card.id, &card_details("9876"))
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.last_four, "9876");
    assert_eq!(second.brand, CardBrand::Mastercard);
    assert_eq!(second.created_by, "alice");
    assert_eq!(second.updated_by, "bob");
    let stored = engine.credit_card_info(tenant.id, card.id).await.unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.last_four, "9876");
}

#[tokio::test]
async fn credit_card_info_is_validated() {
    let (engine, _db) = engine_with_db().await;
    let tenant = engine.new_tenant("Household", "alice").await.unwrap();
    let bank = engine
        .new_account(tenant.id, "alice", &new_account("Checking", "bank"))
        .await
        .unwrap();
    let card = engine
        .new_account(tenant.id, "alice", &new_account("Visa", "credit_card"))
        .await
        .unwrap();

    let Err(EngineError::Validation(errors)) = engine
        .upsert_credit_card_info(tenant.id, "alice", bank.id, &card_details("1234"))
        .await
    else {
        panic!("expected validation error");
    };
    assert_eq!(errors.get("account_id"), Some("account is not a credit card"));

    let Err(EngineError::Validation(errors)) = engine
        .upsert_credit_card_info(
            tenant.id,
            "alice",
            card.id,
            &NewCreditCardInfo {
                brand: "bitcoin".to_string(),
                due_date: None,
                ..card_details("12")
            },
        )
        .await
    else {
        panic!("expected validation error");
    };
    assert_eq!(errors.get("brand"), Some("invalid brand"));
    assert_eq!(errors.get("due_date"), Some("due_date is required"));
    assert_eq!(errors.get("last_four"), Some("last_four must be 4 digits"));

    let other = engine.new_tenant("Other", "bob").await.unwrap();
    assert!(matches!(
        engine.credit_card_info(other.id, card.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}
