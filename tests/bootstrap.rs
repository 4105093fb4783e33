use crm_api_server::test_support::{TestDatabase, TestFixtures, test_auth_state};

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(err) => {
            eprintln!("skipping integration test: could not provision test database: {err:?}");
            None
        }
    }
}

#[tokio::test]
async fn empty_store_bootstraps_exactly_one_admin() {
    let Some(test_db) = provision().await else {
        return;
    };
    let pool = test_db.pool_clone();
    let state = test_auth_state(&pool);

    let created = state
        .user_store
        .ensure_default_admin(&state.password_service, &state.config)
        .await
        .expect("bootstrap");
    assert!(created);

    // A second run finds the admin and creates nothing.
    let created = state
        .user_store
        .ensure_default_admin(&state.password_service, &state.config)
        .await
        .expect("bootstrap");
    assert!(!created);

    let admin_count: i64 = sqlx::query_scalar("SELECT count(*) FROM users WHERE role = 'admin'")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(admin_count, 1);

    // The stored credential is a hash, not the well-known plaintext.
    let stored: String =
        sqlx::query_scalar("SELECT password_hash FROM users WHERE username = 'admin'")
            .fetch_one(&pool)
            .await
            .expect("hash");
    assert_ne!(stored, "admin123");
    assert!(state.password_service.verify_password("admin123", &stored));

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn existing_admin_suppresses_bootstrap() {
    let Some(test_db) = provision().await else {
        return;
    };
    let pool = test_db.pool_clone();
    let state = test_auth_state(&pool);

    let hash = state
        .password_service
        .hash_password("rotated-long-ago")
        .expect("hash");
    TestFixtures::new(&pool)
        .insert_user("head-office", "Head Office", "ops@example.com", "admin", &hash)
        .await
        .expect("seed admin");

    let created = state
        .user_store
        .ensure_default_admin(&state.password_service, &state.config)
        .await
        .expect("bootstrap");
    assert!(!created);

    let user_count: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(user_count, 1);

    test_db.close().await.expect("failed to drop test database");
}
