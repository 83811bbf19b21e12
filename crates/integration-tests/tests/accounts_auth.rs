//! Account management and login with signed tokens

mod common;

use batchdesk_api_rpc::JwtTokenIssuer;
use batchdesk_core::application::TOKEN_TTL_SECS;
use batchdesk_core::domain::{Account, Identity};
use batchdesk_core::port::TokenIssuer;
use batchdesk_core::AppError;
use common::{TestApp, JWT_SECRET};

async fn admin_identity(app: &TestApp) -> Identity {
    app.accounts.ensure_admin("root@example.com", "rootpw").await.unwrap();
    let outcome = app.auth.login("root@example.com", "rootpw").await.unwrap();
    let token = outcome.account.and_then(|a| a.token).unwrap();
    app.auth.validate(&token).unwrap()
}

#[tokio::test]
async fn test_upserted_account_never_exposes_password() {
    let app = TestApp::new().await;
    let admin = admin_identity(&app).await;

    let created = app
        .accounts
        .upsert(
            &admin,
            Account {
                email: " Ann@Example.com ".to_string(),
                password: "annpw".to_string(),
                role: "user".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(created.password.is_empty());

    let fetched = app.accounts.get(&admin, created.id).await.unwrap().unwrap();
    assert_eq!(fetched.email, "ann@example.com");
    assert!(fetched.password.is_empty());

    let listed = app.accounts.list(&admin).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|a| a.password.is_empty()));

    // The stored password still works for login
    let outcome = app.auth.login("ann@example.com", "annpw").await.unwrap();
    assert!(outcome.status);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = TestApp::new().await;
    let admin = admin_identity(&app).await;

    let duplicate = Account {
        email: "root@example.com".to_string(),
        password: "x".to_string(),
        role: "user".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        app.accounts.upsert(&admin, duplicate).await,
        Err(AppError::Query(_))
    ));
}

#[tokio::test]
async fn test_login_failures_carry_no_token() {
    let app = TestApp::new().await;
    app.accounts.ensure_admin("root@example.com", "rootpw").await.unwrap();

    let wrong = app.auth.login("root@example.com", "nope").await.unwrap();
    assert!(!wrong.status);
    assert_eq!(wrong.message, "Invalid login credentials. Please try again");
    assert!(wrong.account.is_none());

    let unknown = app.auth.login("who@example.com", "rootpw").await.unwrap();
    assert!(!unknown.status);
    assert_eq!(unknown.message, "Email address not found");
}

#[tokio::test]
async fn test_login_token_carries_identity_and_twelve_hours() {
    let app = TestApp::new().await;
    app.accounts.ensure_admin("root@example.com", "rootpw").await.unwrap();

    let outcome = app.auth.login("ROOT@example.com", "rootpw").await.unwrap();
    assert!(outcome.status);
    assert_eq!(outcome.message, "Logged In");
    let account = outcome.account.unwrap();
    assert!(account.password.is_empty());

    let claims = JwtTokenIssuer::new(JWT_SECRET)
        .verify(account.token.as_deref().unwrap())
        .unwrap();
    assert_eq!(claims.user_id, account.id);
    assert_eq!(claims.role, "admin");
    assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    assert_eq!(TOKEN_TTL_SECS, 43_200);

    // Another secret does not accept it
    assert!(matches!(
        JwtTokenIssuer::new("other").verify(account.token.as_deref().unwrap()),
        Err(AppError::Unauthenticated(_))
    ));
}

#[tokio::test]
async fn test_regular_user_cannot_manage_accounts() {
    let app = TestApp::new().await;
    let admin = admin_identity(&app).await;
    let user = app
        .accounts
        .upsert(
            &admin,
            Account {
                email: "bob@example.com".to_string(),
                password: "bobpw".to_string(),
                role: "user".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let outcome = app.auth.login("bob@example.com", "bobpw").await.unwrap();
    let identity = app
        .auth
        .validate(&outcome.account.and_then(|a| a.token).unwrap())
        .unwrap();
    assert_eq!(identity.user_id, user.id);

    assert!(matches!(
        app.accounts.delete(&identity, admin.user_id).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(app.accounts.delete(&admin, user.id).await.unwrap());
}
