// src/main.rs

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::error::Error;

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeResponse {
    username: String,
    name: String,
    role: String,
    department: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChangedResponse {
    changed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url = "http://localhost:8080";
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health_response = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;

    println!("Health check response: {:?}", health_response);

    // Test 2: Unauthenticated access is rejected
    println!("\n🔍 Testing that /api/me requires a session...");
    let me_response = client.get(format!("{}/api/me", base_url)).send().await?;
    println!("Unauthenticated /api/me status: {}", me_response.status());

    // Test 3: Login as the seeded manager
    println!("\n🔍 Logging in as manager1...");
    let login_response = client
        .post(format!("{}/auth/login", base_url))
        .json(&json!({ "username": "manager1", "password": "password2" }))
        .send()
        .await?;

    println!("Login status: {}", login_response.status());
    if !login_response.status().is_success() {
        println!("Login failed: {}", login_response.text().await?);
        return Ok(());
    }
    let employee = login_response.json::<EmployeeResponse>().await?;
    println!(
        "Signed in as {} ({}, {} / {})",
        employee.username, employee.name, employee.department, employee.role
    );

    // Test 4: Create an assignment for a seeded course occurrence
    println!("\n🔍 Creating an assignment for C-101 on 2025-06-15...");
    let created = client
        .post(format!("{}/api/assignments", base_url))
        .json(&json!({ "courseId": "C-101", "date": "2025-06-15" }))
        .send()
        .await?
        .json::<CreatedResponse>()
        .await?;
    println!("Assignment id: {}", created.id);

    // Test 5: Staff it and give it a vehicle
    println!("\n🔍 Adding member M-01 and vehicle V-01...");
    let member_changed = client
        .post(format!("{}/api/assignments/{}/members", base_url, created.id))
        .json(&json!({ "memberId": "M-01" }))
        .send()
        .await?
        .json::<ChangedResponse>()
        .await?;
    println!("Member added: {:?}", member_changed);

    let vehicle_changed = client
        .put(format!("{}/api/assignments/{}/vehicle", base_url, created.id))
        .json(&json!({ "vehicleId": "V-01" }))
        .send()
        .await?
        .json::<ChangedResponse>()
        .await?;
    println!("Vehicle set: {:?}", vehicle_changed);

    // Test 6: Day schedule and understaffed dates
    println!("\n🔍 Fetching the schedule for 2025-06-15...");
    let schedule = client
        .get(format!("{}/api/schedule/2025-06-15", base_url))
        .send()
        .await?
        .text()
        .await?;
    println!("Schedule: {}", schedule);

    println!("\n🔍 Fetching understaffed dates...");
    let understaffed = client
        .get(format!("{}/api/understaffed", base_url))
        .send()
        .await?
        .text()
        .await?;
    println!("Understaffed dates: {}", understaffed);

    // Test 7: Monthly workload report
    println!("\n🔍 Fetching the June 2025 workload report...");
    let workload = client
        .get(format!("{}/api/workload/2025/6", base_url))
        .send()
        .await?
        .text()
        .await?;
    println!("Workload: {}", workload);

    // Test 8: Logout ends the session
    println!("\n🔍 Logging out...");
    let logout_response = client
        .post(format!("{}/auth/logout", base_url))
        .send()
        .await?;
    println!("Logout status: {}", logout_response.status());

    let me_after = client.get(format!("{}/api/me", base_url)).send().await?;
    println!("/api/me after logout: {}", me_after.status());

    println!("\n✅ Testing complete!");

    Ok(())
}
