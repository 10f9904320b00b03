//! Stripe gateway tests against a mock HTTP server.

use customer_sync_core::{
    CreateCustomerArgs, CustomerId, CustomerUpdate, GatewayError, PaymentGateway,
};
use customer_sync_stripe::{GatewayOptions, StripeGateway};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, StripeGateway) {
    let server = MockServer::start().await;
    let gateway =
        StripeGateway::with_options("sk_test_mock", GatewayOptions::with_base_url(server.uri()))
            .expect("gateway");
    (server, gateway)
}

fn customer_id(raw: &str) -> CustomerId {
    raw.parse().expect("customer id")
}

// ============================================================================
// Customers
// ============================================================================

#[tokio::test]
async fn create_customer_posts_form_fields() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/customers"))
        .and(header_exists("authorization"))
        .and(body_string_contains("email=ada%40example.com"))
        .and(body_string_contains("metadata%5Bsite%5D=shop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_new",
            "object": "customer",
            "email": "ada@example.com",
            "created": 1_700_000_000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut args = CreateCustomerArgs {
        email: Some("ada@example.com".into()),
        description: Some("Name: Ada Lovelace Username: ada".into()),
        ..CreateCustomerArgs::default()
    };
    args.metadata.insert("site".into(), "shop".into());

    let customer = gateway.create_customer(&args).await.unwrap();
    assert_eq!(customer.id, "cus_new");
    assert_eq!(customer.email.as_deref(), Some("ada@example.com"));
    assert!(!customer.deleted);
}

#[tokio::test]
async fn retrieve_customer_gets_by_id() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/customers/cus_1"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_1",
            "object": "customer",
            "email": "ada@example.com",
            "default_source": "card_9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/customers/cus_gone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_gone",
            "object": "customer",
            "deleted": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let customer = gateway
        .retrieve_customer(&customer_id("cus_1"))
        .await
        .unwrap();
    assert_eq!(customer.id, "cus_1");
    assert_eq!(customer.default_source.as_deref(), Some("card_9"));
    assert!(!customer.deleted);

    let gone = gateway
        .retrieve_customer(&customer_id("cus_gone"))
        .await
        .unwrap();
    assert!(gone.deleted);
}

#[tokio::test]
async fn update_customer_sets_default_source() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/customers/cus_1"))
        .and(body_string_contains("default_source=card_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_1",
            "default_source": "card_9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = CustomerUpdate {
        default_source: Some("card_9".into()),
    };
    let customer = gateway
        .update_customer(&customer_id("cus_1"), &update)
        .await
        .unwrap();
    assert_eq!(customer.default_source.as_deref(), Some("card_9"));
}

// ============================================================================
// Sources
// ============================================================================

#[tokio::test]
async fn attach_source_missing_customer_is_classified() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/customers/cus_gone/sources"))
        .and(body_string_contains("source=src_1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "message": "No such customer: 'cus_gone'",
                "code": "resource_missing",
                "param": "customer"
            }
        })))
        .mount(&server)
        .await;

    let err = gateway
        .attach_source(&customer_id("cus_gone"), "src_1")
        .await
        .unwrap_err();

    assert!(err.is_no_such_customer());
    let GatewayError::Api(remote) = err else {
        panic!("expected api error");
    };
    assert_eq!(remote.raw["error"]["param"], "customer");
}

#[tokio::test]
async fn list_sources_sends_limit() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/customers/cus_1/sources"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "has_more": false,
            "data": [
                {"id": "card_1", "object": "card", "brand": "Visa", "last4": "4242"},
                {"id": "src_2", "object": "source", "type": "sepa_debit",
                 "sepa_debit": {"last4": "3000"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = gateway
        .list_sources(&customer_id("cus_1"), 100)
        .await
        .unwrap();
    assert_eq!(list.data.len(), 2);
    assert_eq!(list.data[0].id, "card_1");
    assert_eq!(list.data[1].source_type.as_deref(), Some("sepa_debit"));
}

#[tokio::test]
async fn delete_source_uses_delete_verb() {
    let (server, gateway) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/customers/cus_1/sources/card_1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "card_1", "deleted": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body = gateway
        .delete_source(&customer_id("cus_1"), "card_1")
        .await
        .unwrap();
    assert_eq!(body["deleted"], true);
}

// ============================================================================
// Payment methods
// ============================================================================

#[tokio::test]
async fn attach_payment_method_posts_customer() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/payment_methods/pm_1/attach"))
        .and(body_string_contains("customer=cus_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pm_1",
            "object": "payment_method",
            "type": "card",
            "customer": "cus_1",
            "card": {"brand": "visa", "last4": "4242", "exp_month": 3, "exp_year": 2031}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let method = gateway
        .attach_payment_method(&customer_id("cus_1"), "pm_1")
        .await
        .unwrap();
    assert_eq!(method.customer.as_deref(), Some("cus_1"));
    assert_eq!(method.card.and_then(|c| c.exp_year), Some(2031));
}

#[tokio::test]
async fn list_payment_methods_filters_by_type() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/payment_methods"))
        .and(query_param("customer", "cus_1"))
        .and(query_param("type", "card"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "has_more": false,
            "data": [{"id": "pm_1", "object": "payment_method", "type": "card"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Out-of-range limits are clamped to the API maximum.
    let list = gateway
        .list_payment_methods(&customer_id("cus_1"), "card", 500)
        .await
        .unwrap();
    assert_eq!(list.data.len(), 1);
}

#[tokio::test]
async fn undecodable_success_body_is_transport_error() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/customers/cus_1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = gateway
        .retrieve_customer(&customer_id("cus_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
}
