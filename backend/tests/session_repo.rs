use chrono::{Duration, Utc};

use budgetbook_backend::repositories::session as session_repo;

mod support;

use support::{seed_user_with_password, test_app, unique_email};

#[tokio::test]
async fn created_session_is_found_while_unexpired() {
    let (pool, _config, _app) = test_app().await;
    let user = seed_user_with_password(&pool, &unique_email(), "Secret1!").await;

    let session = session_repo::create_session(&pool, &user.id, 24)
        .await
        .expect("create session");
    assert_eq!(session.user_id, user.id);
    assert!(session.expires_at > Utc::now());

    let found = session_repo::find_valid_session(&pool, &session.id, Utc::now())
        .await
        .expect("find session")
        .expect("session present");
    assert_eq!(found.id, session.id);
}

#[tokio::test]
async fn expired_session_is_not_found() {
    let (pool, _config, _app) = test_app().await;
    let user = seed_user_with_password(&pool, &unique_email(), "Secret1!").await;

    let session = session_repo::create_session(&pool, &user.id, -1)
        .await
        .expect("create session");

    let found = session_repo::find_valid_session(&pool, &session.id, Utc::now())
        .await
        .expect("find session");
    assert!(found.is_none());

    // Probing with a clock before the expiry still finds it.
    let earlier = Utc::now() - Duration::hours(2);
    let found = session_repo::find_valid_session(&pool, &session.id, earlier)
        .await
        .expect("find session");
    assert!(found.is_some());
}

#[tokio::test]
async fn touch_extends_the_expiry_window() {
    let (pool, _config, _app) = test_app().await;
    let user = seed_user_with_password(&pool, &unique_email(), "Secret1!").await;

    let session = session_repo::create_session(&pool, &user.id, 1)
        .await
        .expect("create session");

    let later = Utc::now() + Duration::minutes(30);
    assert!(session_repo::touch_session(&pool, &session.id, later, 24)
        .await
        .expect("touch session"));

    let touched = session_repo::find_valid_session(&pool, &session.id, Utc::now())
        .await
        .expect("find session")
        .expect("session present");
    assert_eq!(touched.last_seen_at, later);
    assert!(touched.expires_at > session.expires_at);

    // Touching a missing session reports false.
    assert!(!session_repo::touch_session(&pool, "no-such-session", Utc::now(), 24)
        .await
        .expect("touch missing"));
}

#[tokio::test]
async fn delete_by_id_reports_whether_a_row_was_removed() {
    let (pool, _config, _app) = test_app().await;
    let user = seed_user_with_password(&pool, &unique_email(), "Secret1!").await;

    let session = session_repo::create_session(&pool, &user.id, 24)
        .await
        .expect("create session");

    assert!(session_repo::delete_session_by_id(&pool, &session.id)
        .await
        .expect("delete session"));
    assert!(!session_repo::delete_session_by_id(&pool, &session.id)
        .await
        .expect("delete again"));
}

#[tokio::test]
async fn delete_for_user_removes_every_session_of_that_user_only() {
    let (pool, _config, _app) = test_app().await;
    let user_a = seed_user_with_password(&pool, &unique_email(), "Secret1!").await;
    let user_b = seed_user_with_password(&pool, &unique_email(), "Secret1!").await;

    session_repo::create_session(&pool, &user_a.id, 24)
        .await
        .expect("create session");
    session_repo::create_session(&pool, &user_a.id, 24)
        .await
        .expect("create session");
    session_repo::create_session(&pool, &user_b.id, 24)
        .await
        .expect("create session");

    let deleted = session_repo::delete_sessions_for_user(&pool, &user_a.id)
        .await
        .expect("delete sessions");
    assert_eq!(deleted, 2);

    let remaining_a = session_repo::count_sessions_for_user(&pool, &user_a.id)
        .await
        .expect("count sessions");
    let remaining_b = session_repo::count_sessions_for_user(&pool, &user_b.id)
        .await
        .expect("count sessions");
    assert_eq!(remaining_a, 0);
    assert_eq!(remaining_b, 1);
}

#[tokio::test]
async fn cleanup_removes_only_expired_sessions() {
    let (pool, _config, _app) = test_app().await;
    let user = seed_user_with_password(&pool, &unique_email(), "Secret1!").await;

    let expired = session_repo::create_session(&pool, &user.id, -1)
        .await
        .expect("create expired session");
    let live = session_repo::create_session(&pool, &user.id, 24)
        .await
        .expect("create live session");

    // Other tests may leave expired rows behind, so only assert a lower bound.
    let deleted = session_repo::cleanup_expired_sessions(&pool)
        .await
        .expect("cleanup");
    assert!(deleted >= 1);

    assert!(session_repo::find_valid_session(&pool, &expired.id, Utc::now() - Duration::hours(2))
        .await
        .expect("find expired")
        .is_none());
    assert!(session_repo::find_valid_session(&pool, &live.id, Utc::now())
        .await
        .expect("find live")
        .is_some());
}
