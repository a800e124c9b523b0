//! API integration tests
//!
//! These tests require a running server with a database, seeded with
//! the default admin account. Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:5000/api/v1";

/// Helper to log in as the default admin and return a bearer token
async fn get_admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@library.com",
            "password": "Library@123"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@library.com",
            "password": "Library@123"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@library.com",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_register_weak_password_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "weakling",
            "email": "weakling@example.com",
            "password": "short"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_me_requires_auth() {
    let client = Client::new();

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_me() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["username"], "admin");
    assert_eq!(body["email"], "admin@library.com");
}

#[tokio::test]
#[ignore]
async fn test_create_and_fetch_book() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    // Unique ISBN so the test can be re-run
    let isbn = format!("978{:010}", std::process::id());

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "The Rust Programming Language",
            "author": "Steve Klabnik",
            "isbn": isbn,
            "category": "Programming",
            "total_copies": 3
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let created: Value = response.json().await.expect("Failed to parse response");
    let id = created["id"].as_i64().expect("No id in response");
    assert_eq!(created["available_copies"], 3);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let fetched: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(fetched["title"], created["title"]);
    assert_eq!(fetched["isbn"], created["isbn"]);
    assert_eq!(fetched["total_copies"], created["total_copies"]);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_conflict() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let isbn = format!("979{:010}", std::process::id());
    let book = json!({
        "title": "Duplicated",
        "author": "Copy Cat",
        "isbn": isbn,
        "total_copies": 1
    });

    let first = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&book)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&book)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_list_books_paginated() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/books?page=1&per_page=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 5);
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_borrow_nonexistent_book() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .post(format!("{}/transactions", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "book_id": 999_999,
            "member_id": 999_999
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let suffix = std::process::id();

    // Create a book with a single copy
    let book: Value = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Circulation Test",
            "author": "Test Author",
            "isbn": format!("977{:010}", suffix),
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let book_id = book["id"].as_i64().unwrap();

    // Create a member
    let member: Value = client
        .post(format!("{}/members", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Circulation Member",
            "email": format!("circ{}@example.com", suffix),
            "phone": "555-0100"
        }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let member_id = member["id"].as_i64().unwrap();

    // Borrow
    let borrow = client
        .post(format!("{}/transactions", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "book_id": book_id, "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(borrow.status(), 201);
    let borrow_body: Value = borrow.json().await.expect("Failed to parse response");
    let transaction_id = borrow_body["id"].as_i64().unwrap();

    // Borrowing the same book again is a duplicate loan
    let again = client
        .post(format!("{}/transactions", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "book_id": book_id, "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(again.status(), 409);

    // Return
    let ret = client
        .post(format!("{}/transactions/{}/return", BASE_URL, transaction_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(ret.status().is_success());

    // Copy is back on the shelf
    let refreshed: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(refreshed["available_copies"], 1);

    // Returning twice is a conflict
    let twice = client
        .post(format!("{}/transactions/{}/return", BASE_URL, transaction_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(twice.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_borrow_with_no_copies_left() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let suffix = format!("{}e", std::process::id());

    let book: Value = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Single Copy",
            "author": "Test Author",
            "isbn": format!("976{:010}", std::process::id()),
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let book_id = book["id"].as_i64().unwrap();

    let mut member_ids = Vec::new();
    for i in 0..2 {
        let member: Value = client
            .post(format!("{}/members", BASE_URL))
            .bearer_auth(&token)
            .json(&json!({
                "name": format!("Shelf Racer {}", i),
                "email": format!("racer{}{}@example.com", i, suffix),
                "phone": "555-0101"
            }))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse response");
        member_ids.push(member["id"].as_i64().unwrap());
    }

    // First member takes the only copy
    let first = client
        .post(format!("{}/transactions", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "book_id": book_id, "member_id": member_ids[0] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status(), 201);

    // A different member hits the exhausted-copies guard
    let second = client
        .post(format!("{}/transactions", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "book_id": book_id, "member_id": member_ids[1] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_fulfill_respects_borrow_rules() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let suffix = format!("{}f", std::process::id());

    let book: Value = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Reserved Book",
            "author": "Test Author",
            "isbn": format!("975{:010}", std::process::id()),
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let book_id = book["id"].as_i64().unwrap();

    let borrower: Value = client
        .post(format!("{}/members", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Current Borrower",
            "email": format!("borrower{}@example.com", suffix),
            "phone": "555-0102"
        }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let borrower_id = borrower["id"].as_i64().unwrap();

    let reserver: Value = client
        .post(format!("{}/members", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Waiting Reserver",
            "email": format!("reserver{}@example.com", suffix),
            "phone": "555-0103"
        }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let reserver_id = reserver["id"].as_i64().unwrap();

    // Take the only copy, then reserve it for the second member
    let loan: Value = client
        .post(format!("{}/transactions", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "book_id": book_id, "member_id": borrower_id }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let transaction_id = loan["id"].as_i64().unwrap();

    let reservation = client
        .post(format!("{}/reservations", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "book_id": book_id, "member_id": reserver_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(reservation.status(), 201);
    let reservation: Value = reservation.json().await.expect("Failed to parse response");
    let reservation_id = reservation["id"].as_i64().unwrap();

    // Copy comes back, but the reserving member is deactivated meanwhile
    let returned = client
        .post(format!("{}/transactions/{}/return", BASE_URL, transaction_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(returned.status().is_success());

    let deactivated = client
        .put(format!("{}/members/{}", BASE_URL, reserver_id))
        .bearer_auth(&token)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(deactivated.status().is_success());

    // Fulfillment must apply the same rules as a direct borrow
    let fulfill = client
        .post(format!("{}/reservations/{}/fulfill", BASE_URL, reservation_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(fulfill.status(), 422);

    // The refused reservation is still waiting in the queue
    let pending: Value = client
        .get(format!(
            "{}/reservations?status=pending&book_id={}",
            BASE_URL, book_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let ids: Vec<i64> = pending["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&reservation_id));
}

#[tokio::test]
#[ignore]
async fn test_register_rejects_invalid_username() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "bad user!",
            "email": "baduser@example.com",
            "password": "Str0ng@pass"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_users_requires_admin() {
    let client = Client::new();

    // Register a plain member account
    let suffix = std::process::id();
    let email = format!("plain{}@example.com", suffix);
    let register = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": format!("plain{}", suffix),
            "email": email,
            "password": "Plain@1234"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(register.status(), 201);

    let login: Value = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "Plain@1234" }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let token = login["token"].as_str().unwrap();

    let response = client
        .get(format!("{}/users", BASE_URL))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_stats() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total_books"].is_number());
    assert!(body["outstanding_loans"].is_number());
    assert!(body["pending_reservations"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_export_books_csv() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/export/books.csv", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let body = response.text().await.expect("Failed to read response");
    assert!(body.starts_with("title,author,isbn"));
}

#[tokio::test]
#[ignore]
async fn test_export_books_pdf() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/export/books.pdf", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );

    let body = response.bytes().await.expect("Failed to read response");
    assert!(body.starts_with(b"%PDF"));
}
