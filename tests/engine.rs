//! End-to-end tests over the HTTP surface with the in-memory store.
//!
//! Scenarios:
//! - full submit -> approve round trip with balance assertions
//! - loss-of-pay substitution visible through the API
//! - overlap conflict surfaced as 409
//! - credit request approval feeding the compensatory-off balance
//! - role gating on admin endpoints

use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{App, test};
use serde_json::{Value, json};

use hrm_leave::config::Config;
use hrm_leave::notify::LogNotifier;
use hrm_leave::routes;
use hrm_leave::state::AppState;
use hrm_leave::store::Store;

const EMPLOYEE: u64 = 1000;
const MANAGER: u64 = 2000;

fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".to_string(),
        database_url: None,
        api_prefix: "/api/v1".to_string(),
        rate_read_per_min: 60_000,
        rate_mutate_per_min: 60_000,
    }
}

async fn test_state() -> Data<AppState> {
    let state = Data::new(AppState::new(Store::mem(), Arc::new(LogNotifier)));
    state.registry.seed_defaults().await.unwrap();

    for (id, manager_id, name) in [
        (EMPLOYEE, Some(MANAGER), "Asha Rao"),
        (MANAGER, None, "Ben Cole"),
    ] {
        state
            .store
            .upsert_employee(&hrm_leave::model::EmployeeProfile {
                employee_id: id,
                full_name: name.to_string(),
                gender: hrm_leave::model::Gender::Female,
                department: "Engineering".to_string(),
                manager_id,
                date_of_joining: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                active: true,
            })
            .await
            .unwrap();
    }
    state
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(|cfg| routes::configure(cfg, test_config())),
        )
        .await
    };
}

// The governor key extractor wants a peer address on every request.
fn with_peer(req: test::TestRequest) -> test::TestRequest {
    req.peer_addr("127.0.0.1:9999".parse().unwrap())
}

fn as_employee(req: test::TestRequest) -> test::TestRequest {
    with_peer(req)
        .insert_header(("X-Role", "employee"))
        .insert_header(("X-Employee-Id", EMPLOYEE.to_string()))
}

fn as_manager(req: test::TestRequest) -> test::TestRequest {
    with_peer(req)
        .insert_header(("X-Role", "manager"))
        .insert_header(("X-Employee-Id", MANAGER.to_string()))
}

fn as_hr(req: test::TestRequest) -> test::TestRequest {
    with_peer(req)
        .insert_header(("X-Role", "hr_admin"))
        .insert_header(("X-Employee-Id", "3000"))
}

async fn type_id_of(state: &AppState, kind: hrm_leave::model::LeaveKind) -> u64 {
    state.registry.get_by_kind(kind).await.unwrap().id
}

/// Future working Monday relative to nothing in particular; all requests in
/// these tests use explicit dates well past any advance-notice window.
fn next_year_monday() -> (chrono::NaiveDate, chrono::NaiveDate) {
    use chrono::{Datelike, Duration, Utc, Weekday};
    let mut day = Utc::now().date_naive() + Duration::days(30);
    while day.weekday() != Weekday::Mon {
        day += Duration::days(1);
    }
    (day, day + Duration::days(4)) // Monday..Friday
}

#[actix_web::test]
async fn submit_approve_round_trip() {
    let state = test_state().await;
    let app = test_app!(state);
    let el = type_id_of(&state, hrm_leave::model::LeaveKind::EarnedLeave).await;
    state
        .ledger
        .admin_credit(
            EMPLOYEE,
            el,
            {
                use chrono::Datelike;
                next_year_monday().0.year()
            },
            10.0,
            hrm_leave::model::CreditBucket::Entitlement,
        )
        .await
        .unwrap();

    let (monday, friday) = next_year_monday();
    let req = as_employee(test::TestRequest::post().uri("/api/v1/leaves/apply")).set_json(json!({
        "leave_type_id": el,
        "duration_type": "multiple_days",
        "from_date": monday,
        "to_date": friday,
        "reason": "family wedding",
        "number_of_days": 42.0
    }));
    let resp: Value = test::call_and_read_body_json(&app, req.to_request()).await;
    assert_eq!(resp["status"], "pending");
    assert_eq!(resp["number_of_days"], 5.0);
    let id = resp["id"].as_u64().unwrap();

    // Manager approves.
    let req = as_manager(test::TestRequest::put().uri(&format!("/api/v1/leaves/{id}/approve")))
        .set_json(json!({"note": "approved"}));
    let resp: Value = test::call_and_read_body_json(&app, req.to_request()).await;
    assert_eq!(resp["status"], "approved");

    // Balance reflects the committed reservation.
    let req = as_employee(test::TestRequest::get().uri(&format!(
        "/api/v1/balances/my?year={}",
        {
            use chrono::Datelike;
            monday.year()
        }
    )));
    let balances: Value = test::call_and_read_body_json(&app, req.to_request()).await;
    let el_row = balances
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["leave_type_id"].as_u64() == Some(el))
        .unwrap();
    assert_eq!(el_row["taken"], 5.0);
    assert_eq!(el_row["pending_approval"], 0.0);
    assert_eq!(el_row["available"], 5.0);
}

#[actix_web::test]
async fn overlap_is_a_conflict() {
    let state = test_state().await;
    let app = test_app!(state);
    let el = type_id_of(&state, hrm_leave::model::LeaveKind::EarnedLeave).await;
    let (monday, friday) = next_year_monday();
    state
        .ledger
        .admin_credit(
            EMPLOYEE,
            el,
            {
                use chrono::Datelike;
                monday.year()
            },
            10.0,
            hrm_leave::model::CreditBucket::Entitlement,
        )
        .await
        .unwrap();

    let body = json!({
        "leave_type_id": el,
        "duration_type": "multiple_days",
        "from_date": monday,
        "to_date": friday,
        "reason": "first request"
    });
    let req = as_employee(test::TestRequest::post().uri("/api/v1/leaves/apply")).set_json(&body);
    let resp = test::call_service(&app, req.to_request()).await;
    assert!(resp.status().is_success());

    let req = as_employee(test::TestRequest::post().uri("/api/v1/leaves/apply")).set_json(&body);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CONFLICT);
}

#[actix_web::test]
async fn lop_substitution_over_http() {
    let state = test_state().await;
    let app = test_app!(state);
    let el = type_id_of(&state, hrm_leave::model::LeaveKind::EarnedLeave).await;
    let lop = type_id_of(&state, hrm_leave::model::LeaveKind::LossOfPay).await;
    let (monday, friday) = next_year_monday();

    // No earned-leave balance at all: the request flips to loss_of_pay.
    let req = as_employee(test::TestRequest::post().uri("/api/v1/leaves/apply")).set_json(json!({
        "leave_type_id": el,
        "duration_type": "multiple_days",
        "from_date": monday,
        "to_date": friday,
        "reason": "unplanned travel"
    }));
    let resp: Value = test::call_and_read_body_json(&app, req.to_request()).await;
    assert_eq!(resp["leave_type_id"].as_u64(), Some(lop));
    assert!(
        resp["reason"]
            .as_str()
            .unwrap()
            .contains("auto-converted")
    );
}

#[actix_web::test]
async fn credit_workflow_over_http() {
    let state = test_state().await;
    let app = test_app!(state);
    let co = type_id_of(&state, hrm_leave::model::LeaveKind::CompensatoryOff).await;

    let worked = chrono::Utc::now().date_naive() - chrono::Duration::days(7);
    let req = as_employee(test::TestRequest::post().uri("/api/v1/credits")).set_json(json!({
        "date_worked": worked,
        "reason": "production support on a Sunday"
    }));
    let resp: Value = test::call_and_read_body_json(&app, req.to_request()).await;
    assert_eq!(resp["status"], "pending");
    let id = resp["id"].as_u64().unwrap();

    let req = as_manager(test::TestRequest::put().uri(&format!("/api/v1/credits/{id}/approve")));
    let resp: Value = test::call_and_read_body_json(&app, req.to_request()).await;
    assert_eq!(resp["status"], "approved");

    let balance = state
        .ledger
        .balance_snapshot(EMPLOYEE, co, {
            use chrono::Datelike;
            worked.year()
        })
        .await
        .unwrap();
    assert_eq!(balance.accrued, 1.0);
    assert_eq!(balance.available, 1.0);
}

#[actix_web::test]
async fn admin_endpoints_are_role_gated() {
    let state = test_state().await;
    let app = test_app!(state);

    // Employees cannot create leave types.
    let req = as_employee(test::TestRequest::post().uri("/api/v1/leave-types")).set_json(json!({
        "kind": "casual_leave",
        "abbr": "XCL",
        "annual_entitlement": 5.0,
        "accrual_method": "monthly"
    }));
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);

    // Employees cannot read organization-wide analytics.
    let req = as_employee(test::TestRequest::get().uri("/api/v1/analytics"));
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);

    // HR can.
    let req = as_hr(test::TestRequest::get().uri("/api/v1/analytics"));
    let resp = test::call_service(&app, req.to_request()).await;
    assert!(resp.status().is_success());

    // Requests without identity headers are unauthorized.
    let req = test::TestRequest::get()
        .uri("/api/v1/leaves")
        .peer_addr("127.0.0.1:9999".parse().unwrap());
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn holiday_crud_shapes_day_counts() {
    let state = test_state().await;
    let app = test_app!(state);
    let el = type_id_of(&state, hrm_leave::model::LeaveKind::EarnedLeave).await;
    let (monday, friday) = next_year_monday();
    state
        .ledger
        .admin_credit(
            EMPLOYEE,
            el,
            {
                use chrono::Datelike;
                monday.year()
            },
            10.0,
            hrm_leave::model::CreditBucket::Entitlement,
        )
        .await
        .unwrap();

    // Declare the Wednesday a holiday.
    let wednesday = monday + chrono::Duration::days(2);
    let req = as_hr(test::TestRequest::post().uri("/api/v1/holidays")).set_json(json!({
        "name": "Founders Day",
        "holiday_date": wednesday,
        "holiday_type": "declared"
    }));
    let resp = test::call_service(&app, req.to_request()).await;
    assert!(resp.status().is_success());

    // The week now charges four days instead of five.
    let req = as_employee(test::TestRequest::post().uri("/api/v1/leaves/apply")).set_json(json!({
        "leave_type_id": el,
        "duration_type": "multiple_days",
        "from_date": monday,
        "to_date": friday,
        "reason": "holiday week"
    }));
    let resp: Value = test::call_and_read_body_json(&app, req.to_request()).await;
    assert_eq!(resp["number_of_days"], 4.0);
}
