use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use biyo_server::{build, ServerConfig};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> Router {
    build(ServerConfig::default()).unwrap().router
}

fn enforcing_router() -> Router {
    let config = ServerConfig {
        enforce_tenant: true,
        ..ServerConfig::default()
    };
    build(config).unwrap().router
}

async fn call(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    call(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    call(router, req).await
}

async fn delete(router: &Router, uri: &str) -> (StatusCode, Value) {
    call(router, Request::delete(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn patients_are_stamped_and_scoped_by_clinic() {
    let r = router();

    let (status, created) = post(&r, "/api/patients?clinicId=c1", json!({ "name": "Aigerim", "phone": "+7 700" })).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("patient_"));
    assert_eq!(created["clinicId"], "c1");
    assert_eq!(created["teeth"], json!([]));
    assert_eq!(created["services"], json!([]));
    assert_eq!(created["balance"], 0);
    assert!(created["createdAt"].is_string());
    assert!(created["updatedAt"].is_string());

    post(&r, "/api/patients", json!({ "name": "Other", "clinicId": "c2" })).await;

    let (_, list) = get(&r, "/api/patients?clinicId=c1").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Aigerim");

    let (status, one) = get(&r, &format!("/api/patients/{id}?clinicId=c1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["id"], id.as_str());

    let (status, _) = get(&r, &format!("/api/patients/{id}?clinicId=c2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn posting_an_existing_id_replaces_the_record() {
    let r = router();
    post(&r, "/api/doctors?clinicId=c1", json!({ "id": "doctor_1", "name": "Dr A", "color": "#f00" })).await;
    post(&r, "/api/doctors?clinicId=c1", json!({ "id": "doctor_1", "name": "Dr B", "color": "#0f0" })).await;

    let (_, list) = get(&r, "/api/doctors?clinicId=c1").await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "Dr B");
}

#[tokio::test]
async fn delete_needs_id_and_clinic_and_matches_both() {
    let r = router();
    post(&r, "/api/services", json!({ "id": "s1", "name": "Cleaning", "defaultPrice": 50, "clinicId": "c1" })).await;
    post(&r, "/api/services", json!({ "id": "s2", "name": "Cleaning", "defaultPrice": 50, "clinicId": "c2" })).await;

    let (status, body) = delete(&r, "/api/services?id=s1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing id or clinicId");

    let (status, body) = delete(&r, "/api/services?clinicId=c1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing id or clinicId");

    // Wrong clinic: nothing goes, still a success.
    let (status, body) = delete(&r, "/api/services?id=s1&clinicId=c2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    assert_eq!(get(&r, "/api/services?clinicId=c1").await.1.as_array().unwrap().len(), 1);

    let (status, _) = delete(&r, "/api/services/s1?clinicId=c1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(get(&r, "/api/services?clinicId=c1").await.1.as_array().unwrap().is_empty());
    assert_eq!(get(&r, "/api/services?clinicId=c2").await.1.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn removing_a_patient_removes_their_visits_and_files() {
    let r = router();
    post(&r, "/api/patients?clinicId=c1", json!({ "id": "p1", "name": "A" })).await;
    post(&r, "/api/patients?clinicId=c1", json!({ "id": "p2", "name": "B" })).await;
    for (id, patient) in [("v1", "p1"), ("v2", "p1"), ("v3", "p2")] {
        post(
            &r,
            "/api/visits?clinicId=c1",
            json!({ "id": id, "patientId": patient, "doctorId": "d1", "startTime": "2024-03-01T10:00:00Z", "cost": 10 }),
        )
        .await;
    }
    post(&r, "/api/files?clinicId=c1", json!({ "id": "f1", "patientId": "p1", "name": "x.png", "file": "data:" })).await;

    let (status, _) = delete(&r, "/api/patients/p1?clinicId=c1").await;
    assert_eq!(status, StatusCode::OK);

    let (_, visits) = get(&r, "/api/visits?clinicId=c1").await;
    let ids: Vec<&str> = visits.as_array().unwrap().iter().filter_map(|v| v["id"].as_str()).collect();
    assert_eq!(ids, vec!["v3"]);
    assert!(get(&r, "/api/files?clinicId=c1").await.1.as_array().unwrap().is_empty());
    assert_eq!(get(&r, "/api/patients?clinicId=c1").await.1.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn visits_are_normalized_and_filtered() {
    let r = router();
    let (status, visit) = post(
        &r,
        "/api/visits?clinicId=c1",
        json!({
            "patientId": "p1",
            "doctorId": "d1",
            "startTime": "2024-03-01T10:00:00Z",
            "services": ["s1", { "serviceId": "s2", "quantity": 2, "teeth": [11] }],
            "cost": 120
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(visit["id"].as_str().unwrap().starts_with("visit_"));
    assert_eq!(visit["payments"], json!([]));
    assert_eq!(visit["services"][0], json!({ "serviceId": "s1", "quantity": 1 }));
    assert_eq!(visit["services"][1]["teeth"], json!([11]));
    assert_eq!(visit["cashAmount"], 0.0);

    post(&r, "/api/visits?clinicId=c1", json!({ "patientId": "p2", "doctorId": "d2", "status": "completed" })).await;

    let (_, by_patient) = get(&r, "/api/visits?clinicId=c1&patientId=p1").await;
    assert_eq!(by_patient.as_array().unwrap().len(), 1);
    let (_, by_status) = get(&r, "/api/visits?clinicId=c1&status=completed").await;
    assert_eq!(by_status[0]["patientId"], "p2");

    let (status, _) = post(&r, "/api/visits?clinicId=c1", json!({ "services": [42] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payments_update_visit_totals() {
    let r = router();
    post(&r, "/api/visits?clinicId=c1", json!({ "id": "v1", "patientId": "p1", "cost": 100 })).await;

    let (status, cash) = post(&r, "/api/payments?clinicId=c1", json!({ "visitId": "v1", "amount": 40, "method": "cash" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cash["visitId"], "v1");
    post(&r, "/api/payments?clinicId=c1", json!({ "id": "pay_e", "visitId": "v1", "amount": 10, "method": "ewallet" })).await;

    let (_, visit) = get(&r, "/api/visits/v1?clinicId=c1").await;
    assert_eq!(visit["cashAmount"], 40.0);
    assert_eq!(visit["ewalletAmount"], 10.0);
    assert_eq!(visit["payments"].as_array().unwrap().len(), 2);

    let (status, _) = delete(&r, "/api/payments/pay_e?clinicId=c1").await;
    assert_eq!(status, StatusCode::OK);
    let (_, visit) = get(&r, "/api/visits/v1?clinicId=c1").await;
    assert_eq!(visit["ewalletAmount"], 0.0);
    assert_eq!(visit["payments"].as_array().unwrap().len(), 1);

    let (status, _) = delete(&r, "/api/payments/pay_e?clinicId=c1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post(&r, "/api/payments?clinicId=c1", json!({ "visitId": "nope", "amount": 5 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Visit not found");

    let (status, body) = post(&r, "/api/payments?clinicId=c1", json!({ "visitId": "v1", "amount": -1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "amount must be a positive number");

    let (status, _) = get(&r, "/api/payments?clinicId=c1").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn concurrent_payments_on_one_visit_are_all_kept() {
    let r = router();
    post(&r, "/api/visits?clinicId=c1", json!({ "id": "v1", "patientId": "p1", "cost": 500 })).await;

    let tasks: Vec<_> = (0..10)
        .map(|n| {
            let r = r.clone();
            tokio::spawn(async move {
                let body = json!({ "id": format!("pay_{n}"), "visitId": "v1", "amount": 10, "method": "cash" });
                post(&r, "/api/payments?clinicId=c1", body).await.0
            })
        })
        .collect();
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }

    let (_, visit) = get(&r, "/api/visits/v1?clinicId=c1").await;
    assert_eq!(visit["payments"].as_array().unwrap().len(), 10);
    assert_eq!(visit["cashAmount"], 100.0);
}

#[tokio::test]
async fn stored_records_always_read_back_typed() {
    let r = router();

    // Nulls fall back to the record's defaults.
    let (status, _) = post(&r, "/api/patients?clinicId=c1", json!({ "id": "p1", "name": "Dana", "phone": null })).await;
    assert_eq!(status, StatusCode::OK);
    post(&r, "/api/patients?clinicId=c1", json!({ "id": "p2", "name": "Erlan", "phone": "222" })).await;

    let (_, list) = get(&r, "/api/patients?clinicId=c1").await;
    assert_eq!(list.as_array().unwrap().len(), 2);
    let res = r
        .clone()
        .oneshot(Request::get("/api/exports/patients?clinicId=c1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let text = String::from_utf8(res.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
    assert_eq!(text.split("\r\n").filter(|l| !l.is_empty()).count(), 3);

    let (status, visit) = post(&r, "/api/visits?clinicId=c1", json!({ "id": "v1", "patientId": "p1", "cost": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(visit["cashAmount"].as_f64().unwrap().is_sign_positive());
    assert!(visit["ewalletAmount"].as_f64().unwrap().is_sign_positive());
    let (status, _) = post(&r, "/api/payments?clinicId=c1", json!({ "visitId": "v1", "amount": 5 })).await;
    assert_eq!(status, StatusCode::OK);

    // Shapes that cannot be read back are refused.
    let (status, body) = post(&r, "/api/visits?clinicId=c1", json!({ "cost": "a lot" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid visits record");
    let (status, _) = post(&r, "/api/patients?clinicId=c1", json!({ "teeth": [{ "toothNumber": "x" }] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post(&r, "/api/doctors?clinicId=c1", json!({ "name": 7 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, list) = get(&r, "/api/patients?clinicId=c1").await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn users_are_looked_up_by_email_and_unique() {
    let r = router();
    let (status, _) = post(&r, "/api/users", json!({ "id": "u1", "email": "a@clinic.kz", "clinicId": "c1", "role": "admin" })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, found) = get(&r, "/api/users?email=a@clinic.kz").await;
    assert_eq!(found["id"], "u1");

    let (status, missing) = get(&r, "/api/users?email=b@clinic.kz").await;
    assert_eq!(status, StatusCode::OK);
    assert!(missing.is_null());

    let (status, body) = post(&r, "/api/users", json!({ "id": "u2", "email": "a@clinic.kz", "clinicId": "c2" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User with this email already exists");

    // Saving the same user again is an update.
    let (status, _) = post(&r, "/api/users", json!({ "id": "u1", "email": "a@clinic.kz", "clinicId": "c1", "phone": "1" })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, users) = get(&r, "/api/users?clinicId=c1").await;
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn clinics_resolve_by_id() {
    let r = router();
    let (_, clinic) = post(&r, "/api/clinics", json!({ "name": "Smile" })).await;
    let id = clinic["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("clinic_"));
    assert!(clinic["createdAt"].is_string());

    let (_, found) = get(&r, &format!("/api/clinics?id={id}")).await;
    assert_eq!(found["name"], "Smile");
    let (_, missing) = get(&r, "/api/clinics?id=clinic_nope").await;
    assert!(missing.is_null());

    let (status, _) = delete(&r, &format!("/api/clinics/{id}")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn analytics_summary_needs_a_clinic() {
    let r = router();
    post(&r, "/api/patients?clinicId=c1", json!({ "id": "p1", "name": "A" })).await;
    post(&r, "/api/doctors?clinicId=c1", json!({ "id": "d1", "name": "Dr A", "color": "#f00" })).await;
    post(
        &r,
        "/api/visits?clinicId=c1",
        json!({ "id": "v1", "patientId": "p1", "doctorId": "d1", "startTime": "2024-03-01T10:00:00Z", "cost": 100, "status": "completed" }),
    )
    .await;
    post(&r, "/api/payments?clinicId=c1", json!({ "visitId": "v1", "amount": 30, "method": "cash", "date": "2024-03-01T11:00:00Z" })).await;

    let (status, summary) = get(&r, "/api/analytics/summary?clinicId=c1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["patientsTotal"], 1);
    assert_eq!(summary["visitsTotal"], 1);
    assert_eq!(summary["billed"], 100.0);
    assert_eq!(summary["collected"], 30.0);
    assert_eq!(summary["doctors"][0]["doctorId"], "d1");

    let (status, _) = get(&r, "/api/analytics/summary").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&r, "/api/analytics/summary?clinicId=c1&from=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&r, "/api/analytics/other?clinicId=c1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patient_export_is_csv_of_the_filtered_list() {
    let r = router();
    post(&r, "/api/patients?clinicId=c1", json!({ "id": "p1", "name": "Aigerim", "phone": "111" })).await;
    post(&r, "/api/patients?clinicId=c1", json!({ "id": "p2", "name": "Bolat, Jr", "phone": "222" })).await;
    post(&r, "/api/patients?clinicId=c2", json!({ "id": "p3", "name": "Other", "phone": "333" })).await;

    let res = r
        .clone()
        .oneshot(Request::get("/api/exports/patients?clinicId=c1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/csv"));
    let text = String::from_utf8(res.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
    let lines: Vec<&str> = text.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,name,phone"));
    assert!(text.contains("\"Bolat, Jr\""));
    assert!(!text.contains("Other"));

    let res = r
        .clone()
        .oneshot(Request::get("/api/exports/patients?clinicId=c1&q=bolat").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let text = String::from_utf8(res.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
    assert_eq!(text.split("\r\n").filter(|l| !l.is_empty()).count(), 2);

    let (status, _) = get(&r, "/api/exports/patients").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tenant_enforcement_is_opt_in() {
    let open = router();
    let (status, _) = get(&open, "/api/patients").await;
    assert_eq!(status, StatusCode::OK);

    let r = enforcing_router();
    let (status, body) = get(&r, "/api/patients").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "clinicId is required");

    let (status, _) = post(&r, "/api/patients?clinicId=c1", json!({ "name": "x", "clinicId": "c2" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(&r, "/api/patients?clinicId=c1", json!({ "id": "p1", "name": "x" })).await;
    assert_eq!(status, StatusCode::OK);

    // Sign-in lookups and clinic records stay open.
    let (status, _) = get(&r, "/api/users?email=a@b.kz").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&r, "/api/clinics").await;
    assert_eq!(status, StatusCode::OK);

    // Single reads, writes and deletes must name a clinic too.
    let (status, body) = get(&r, "/api/patients/p1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "clinicId is required");
    let (status, _) = post(&r, "/api/patients", json!({ "name": "y", "clinicId": "c1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    post(&r, "/api/visits?clinicId=c1", json!({ "id": "v1", "patientId": "p1" })).await;
    let (status, _) = post(&r, "/api/payments", json!({ "visitId": "v1", "amount": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post(&r, "/api/payments?clinicId=c2", json!({ "visitId": "v1", "amount": 5 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = delete(&r, "/api/payments/pay_1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, visit) = get(&r, "/api/visits/v1?clinicId=c1").await;
    assert!(visit["payments"].as_array().unwrap().is_empty());

    // Cascades run as internal calls.
    let (status, _) = delete(&r, "/api/patients/p1?clinicId=c1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(get(&r, "/api/visits?clinicId=c1").await.1.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_answers_on_both_paths() {
    let r = router();
    for path in ["/health", "/api/health"] {
        let (status, body) = get(&r, path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert!(body["timestamp"].is_string());
    }
}

#[tokio::test]
async fn file_store_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        store: biyo_server::StoreConfig::File { dir: dir.path().to_path_buf() },
        ..ServerConfig::default()
    };

    let r = build(config.clone()).unwrap().router;
    post(&r, "/api/patients?clinicId=c1", json!({ "id": "p1", "name": "Kept" })).await;
    drop(r);

    let r = build(config).unwrap().router;
    let (_, list) = get(&r, "/api/patients?clinicId=c1").await;
    assert_eq!(list[0]["name"], "Kept");
}
