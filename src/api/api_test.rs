use super::endpoints::{
    BadgeType, BankDetails, InviteRequest, LoginRequest, OtpRequest, PageRequest, PayoutRequest,
    RegisterRequest, UpdateUserRequest,
};
use super::scripted_transport::{referral_api, ScriptedTransport};
use super::transport::TransportRequest;
use super::ReferralApi;
use crate::auth::session::SessionStore;
use crate::auth::token_store::MemoryTokenStore;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

fn scripted_api(data: Value) -> (ReferralApi, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new().ok(data));
    let session = SessionStore::new(Arc::new(MemoryTokenStore::with_tokens("A1", "R1")));
    (referral_api(transport.clone(), session), transport)
}

fn assert_route(request: &TransportRequest, method: Method, path: &str, query: &[(&str, &str)]) {
    assert_eq!(request.method, method, "{path}");
    assert_eq!(request.url, format!("http://backend.test/api/{path}"));
    let sent: Vec<(&str, &str)> = request
        .query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert_eq!(sent, query, "{path}");
    assert_eq!(request.bearer_token.as_deref(), Some("A1"), "{path}");
}

fn user(id: &str) -> Value {
    json!({ "_id": id, "email": "asha@example.com", "role": "USER" })
}

fn empty_page() -> Value {
    json!({ "list": [], "total": 0 })
}

#[tokio::test]
async fn test_public_user_routes() {
    let (api, transport) = scripted_api(json!({ "otp": 123456 }));
    api.login(&LoginRequest {
        email: "asha@example.com".to_string(),
        password: "secret1".to_string(),
    })
    .await
    .unwrap();
    let sent = transport.last();
    assert_route(&sent, Method::POST, "users/login", &[]);
    assert_eq!(
        sent.body,
        Some(json!({ "email": "asha@example.com", "password": "secret1" }))
    );

    let (api, transport) = scripted_api(json!({ "message": "Registered" }));
    let data = api
        .register(&RegisterRequest {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            pin: "123456".to_string(),
            password: "Str0ng#Pass".to_string(),
            confirm_password: "Str0ng#Pass".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(data.message.as_deref(), Some("Registered"));
    let sent = transport.last();
    assert_route(&sent, Method::POST, "users/verify-invitation", &[]);
    assert_eq!(sent.body.unwrap()["confirmPassword"], "Str0ng#Pass");

    let (api, transport) = scripted_api(json!({ "accessToken": "A2", "refreshToken": "R2" }));
    let tokens = api
        .verify_otp(&OtpRequest {
            otp: 123456,
            email: "asha@example.com".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "A2");
    let sent = transport.last();
    assert_route(&sent, Method::POST, "users/verify-otp", &[]);
    assert_eq!(sent.body, Some(json!({ "otp": 123456, "email": "asha@example.com" })));
}

#[tokio::test]
async fn test_profile_invite_and_tree_routes() {
    let (api, transport) = scripted_api(user("u1"));
    assert_eq!(api.profile().await.unwrap().id, "u1");
    assert_route(&transport.last(), Method::GET, "users/me", &[]);

    let (api, transport) = scripted_api(Value::Null);
    api.invite_users(&InviteRequest {
        emails: vec!["b@example.com".to_string()],
        badge_type: Some(BadgeType::Green),
    })
    .await
    .unwrap();
    let sent = transport.last();
    assert_route(&sent, Method::POST, "users/invite", &[]);
    assert_eq!(
        sent.body,
        Some(json!({ "emails": ["b@example.com"], "badgeType": "green" }))
    );

    let (api, transport) = scripted_api(json!({ "id": "u1", "name": "Asha" }));
    assert_eq!(api.referral_tree().await.unwrap().id, "u1");
    assert_route(&transport.last(), Method::GET, "users/tree", &[]);

    let (api, transport) = scripted_api(user("u1"));
    api.personal_details().await.unwrap();
    assert_route(&transport.last(), Method::GET, "users/profile", &[]);
}

#[tokio::test]
async fn test_user_id_query_only_when_given() {
    let (api, transport) = scripted_api(json!(12.5));
    assert_eq!(api.total_commission(None).await.unwrap(), 12.5);
    assert_route(&transport.last(), Method::GET, "commission/total", &[]);

    let (api, transport) = scripted_api(json!(12.5));
    api.total_commission(Some("u7")).await.unwrap();
    assert_route(&transport.last(), Method::GET, "commission/total", &[("id", "u7")]);

    let (api, transport) = scripted_api(json!(40));
    assert_eq!(api.balance(None).await.unwrap(), 40.0);
    assert_route(&transport.last(), Method::GET, "transaction/balance", &[]);

    let (api, transport) = scripted_api(json!(40));
    api.balance(Some("u7")).await.unwrap();
    assert_route(&transport.last(), Method::GET, "transaction/balance", &[("id", "u7")]);
}

#[tokio::test]
async fn test_paged_routes() {
    let page = PageRequest::from_page(3, 10);

    let (api, transport) = scripted_api(empty_page());
    api.transactions(page).await.unwrap();
    assert_route(
        &transport.last(),
        Method::GET,
        "transaction",
        &[("skip", "30"), ("limit", "10")],
    );

    let (api, transport) = scripted_api(empty_page());
    api.commissions(page).await.unwrap();
    assert_route(
        &transport.last(),
        Method::GET,
        "commission",
        &[("skip", "30"), ("limit", "10")],
    );
}

#[tokio::test]
async fn test_user_search_is_trimmed_and_omitted_when_blank() {
    let page = PageRequest::from_page(0, 20);

    let (api, transport) = scripted_api(empty_page());
    api.users(page, Some("  asha ")).await.unwrap();
    assert_route(
        &transport.last(),
        Method::GET,
        "users",
        &[("skip", "0"), ("limit", "20"), ("search", "asha")],
    );

    for blank in [None, Some(""), Some("   ")] {
        let (api, transport) = scripted_api(empty_page());
        api.users(page, blank).await.unwrap();
        assert_route(
            &transport.last(),
            Method::GET,
            "users",
            &[("skip", "0"), ("limit", "20")],
        );
    }
}

#[tokio::test]
async fn test_user_id_is_percent_encoded_in_path() {
    let (api, transport) = scripted_api(user("a b/c"));
    let details = api.user_details("a b/c").await.unwrap();
    assert_eq!(details.user.id, "a b/c");
    assert_route(&transport.last(), Method::GET, "users/a%20b%2Fc", &[]);

    let (api, transport) = scripted_api(Value::Null);
    api.update_user(&UpdateUserRequest {
        id: "a b/c".to_string(),
        name: Some("Asha".to_string()),
        bank_details: Some(BankDetails {
            account_holder_name: "Asha".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    })
    .await
    .unwrap();
    let sent = transport.last();
    assert_route(&sent, Method::PATCH, "users/a%20b%2Fc", &[]);
    let body = sent.body.unwrap();
    assert_eq!(body["_id"], "a b/c");
    assert_eq!(body["bankDetails"]["accountHolderName"], "Asha");
    assert!(body.get("email").is_none());
}

#[tokio::test]
async fn test_payout_route() {
    let (api, transport) = scripted_api(Value::Null);
    api.payout(&PayoutRequest {
        amount: 75.5,
        user_id: "u7".to_string(),
    })
    .await
    .unwrap();
    let sent = transport.last();
    assert_route(&sent, Method::POST, "payout", &[]);
    assert_eq!(sent.body, Some(json!({ "amount": 75.5, "userId": "u7" })));
}
