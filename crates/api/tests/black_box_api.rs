use pinledger_api::app::{build_app, services::build_in_memory_services};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, on an ephemeral port.
        let app = build_app(build_in_memory_services());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn open_account(&self, name: &str, deposit: i64) -> String {
        let (status, body) = self
            .post(
                "/public/account/create",
                json!({ "account_name": name, "pin": "123456", "initial_deposit": deposit }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {body}");
        body["result"]["account_number"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn amount(v: &Value) -> f64 {
    v.as_f64().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(pinledger_api::middleware::REFERENCE_HEADER));
}

#[tokio::test]
async fn create_account_returns_envelope() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv
        .post(
            "/public/account/create",
            json!({ "account_name": "Alice Doe", "pin": "123456", "initial_deposit": 50000 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status_code"], "101");
    assert_eq!(body["message"], "Account created successfully");
    assert!(body["response_datetime"].is_string());
    let result = &body["result"];
    assert_eq!(result["account_name"], "Alice Doe");
    assert_eq!(result["status"], "ACTIVE");
    assert_eq!(amount(&result["balance"]), 50000.0);
    assert_eq!(result["account_number"].as_str().unwrap().len(), 10);
    assert!(result.get("pin_hash").is_none());
}

#[tokio::test]
async fn invalid_input_is_a_validation_envelope() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv
        .post(
            "/public/account/create",
            json!({ "account_name": "Alice Doe", "pin": "12ab", "initial_deposit": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["status_code"], "202");
    assert!(body["result"].is_null());

    // wrong JSON shape still gets an envelope
    let (status, body) = srv
        .post("/public/transaction/deposit", json!({ "amount": "lots" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], "202");
}

#[tokio::test]
async fn withdraw_scenario_over_http() {
    let srv = TestServer::spawn().await;
    let number = srv.open_account("Alice Doe", 50_000).await;

    let (status, body) = srv
        .post(
            "/public/transaction/withdraw",
            json!({ "account_number": number, "amount": 20000, "pin": "123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(amount(&body["result"]["balance_before"]), 50000.0);
    assert_eq!(amount(&body["result"]["balance_after"]), 30000.0);

    let (status, body) = srv
        .post(
            "/public/transaction/withdraw",
            json!({ "account_number": number, "amount": 40000, "pin": "123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], "402");

    let (_, body) = srv
        .post(
            "/public/account/balance",
            json!({ "account_number": number, "pin": "123456" }),
        )
        .await;
    assert_eq!(amount(&body["result"]["balance"]), 30000.0);

    let (_, body) = srv
        .post(
            "/public/transaction/history",
            json!({ "account_number": number }),
        )
        .await;
    assert_eq!(body["message"], "Transaction history retrieved successfully");
    assert_eq!(body["result"]["total_records"], 1);
    assert_eq!(body["result"]["transactions"][0]["transaction_type"], "D");
}

#[tokio::test]
async fn lockout_over_http() {
    let srv = TestServer::spawn().await;
    let number = srv.open_account("Alice Doe", 50_000).await;
    let withdraw = |pin: &'static str| {
        json!({ "account_number": number, "amount": 10000, "pin": pin })
    };

    let (status, body) = srv.post("/public/transaction/withdraw", withdraw("000000")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid PIN. 2 attempt(s) remaining");

    srv.post("/public/transaction/withdraw", withdraw("000000")).await;
    let (status, _) = srv.post("/public/transaction/withdraw", withdraw("000000")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv.post("/public/transaction/withdraw", withdraw("123456")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Account is blocked. Please reset your PIN");

    // recover through forgot/reset
    let (status, body) = srv
        .post("/public/account/forgot-pin", json!({ "account_number": number }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["result"]["reset_token"].as_str().unwrap().to_string();

    let reset = json!({ "reset_token": token, "new_pin": "222222", "confirm_new_pin": "222222" });
    let (status, _) = srv.post("/public/account/reset-pin", reset.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = srv.post("/public/account/reset-pin", reset).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv.post("/public/transaction/withdraw", withdraw("222222")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn transfer_and_detail_over_http() {
    let srv = TestServer::spawn().await;
    let alice = srv.open_account("Alice Doe", 50_000).await;
    let bob = srv.open_account("Bob Roe", 0).await;

    let (status, body) = srv
        .post(
            "/public/transaction/transfer",
            json!({
                "from_account_number": alice,
                "to_account_number": bob,
                "amount": 15000,
                "pin": "123456"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result = &body["result"];
    assert_eq!(amount(&result["from_balance_after"]), 35000.0);
    assert_eq!(amount(&result["to_balance_after"]), 15000.0);

    let (_, body) = srv
        .post(
            "/public/transaction/history",
            json!({ "page": 1, "limit": 10 }),
        )
        .await;
    assert_eq!(body["message"], "All transactions retrieved successfully");
    assert_eq!(body["result"]["pagination"]["total_records"], 2);
    assert_eq!(body["result"]["pagination"]["total_pages"], 1);
    let first_id = body["result"]["transactions"][0]["id"].as_i64().unwrap();

    let (status, body) = srv
        .post(
            "/public/transaction/detail",
            json!({ "transaction_id": first_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["source_number"], alice.as_str());
    assert_eq!(body["result"]["beneficiary_number"], bob.as_str());

    let (status, body) = srv
        .post("/public/transaction/detail", json!({ "transaction_id": 9999 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status_code"], "201");
}

#[tokio::test]
async fn account_management_over_http() {
    let srv = TestServer::spawn().await;
    srv.open_account("Alice Doe", 0).await;

    let (_, body) = srv.post("/public/account/list", json!({})).await;
    let id = body["result"][0]["id"].as_i64().unwrap();

    let (status, body) = srv
        .post(
            "/public/account/update",
            json!({ "id": id, "account_name": "Alice Smith" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["account_name"], "Alice Smith");

    let (status, _) = srv.post("/public/account/delete", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv.post("/public/account/get", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Account not found");
}
