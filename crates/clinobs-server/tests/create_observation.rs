mod common;

use reqwest::StatusCode;
use serde_json::{Value, json};

fn head_injury() -> Value {
    json!({
        "resourceType": "Observation",
        "status": "preliminary",
        "code": {"coding": [{"code": "1234", "display": "Head Injury"}]},
        "subject": {"reference": "Patient/123"},
        "performer": {"reference": "Practitioner/7"}
    })
}

fn with(mut base: Value, extra: Value) -> Value {
    let map = base.as_object_mut().unwrap();
    for (k, v) in extra.as_object().unwrap() {
        map.insert(k.clone(), v.clone());
    }
    base
}

async fn post(client: &reqwest::Client, url: &str, body: &Value) -> (StatusCode, Value) {
    let resp = client.post(url).json(body).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn create_returns_persisted_document() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();

    let body = with(
        head_injury(),
        json!({
            "effectiveDate": "1999-12-05",
            "valueQuantity": {"value": 140, "unit": "cm"}
        }),
    );
    let resp = client
        .post(server.url("/fhir/Observation"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/fhir+json"
    );
    assert!(resp.headers().get("x-request-id").is_some());
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap();

    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_str().unwrap();
    assert_eq!(location, format!("/fhir/Observation/{id}"));
    assert_eq!(created["resourceType"], "Observation");
    assert_eq!(created["effective"], "effectiveDate");
    assert_eq!(created["effectiveDate"], "1999-12-05T00:00:00Z");
    assert_eq!(created["value"], "valueQuantity");
    assert_eq!(created["valueQuantity"], json!({"value": 140.0, "unit": "cm"}));
    assert_eq!(created["basedOn"], json!({}));
    assert_eq!(created["context"], json!({}));
    assert_eq!(created["category"], json!([]));
    assert_eq!(created["dataAbsentReason"], json!({"coding": []}));

    server.stop().await;
}

#[tokio::test]
async fn single_effective_alternative_is_the_only_one_projected() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();

    let cases = [
        ("effectiveDate", json!("1999-12-05")),
        ("effectiveDateTime", json!("2016-03-28T09:30:00Z")),
        (
            "effectivePeriod",
            json!({"start": "2020-01-01T00:00:00Z", "end": "2020-01-02T00:00:00Z"}),
        ),
    ];
    let all = ["effectiveDate", "effectiveDateTime", "effectivePeriod"];

    for (field, value) in cases {
        let body = with(
            head_injury(),
            json!({ field: value, "valueString": "Headache" }),
        );
        let (status, created) = post(&client, &server.url("/fhir/Observation"), &body).await;
        assert_eq!(status, StatusCode::CREATED, "{field}");
        assert_eq!(created["effective"], field);

        let id = created["id"].as_str().unwrap();
        let read: Value = client
            .get(server.url(&format!("/fhir/Observation/{id}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let present: Vec<&str> = all.into_iter().filter(|f| read.get(*f).is_some()).collect();
        assert_eq!(present, vec![field]);
        assert!(read.get("effective").is_none());
    }

    server.stop().await;
}

#[tokio::test]
async fn single_value_alternative_is_the_only_one_projected() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();

    let cases = [
        ("valueQuantity", json!({"value": 140, "unit": "cm"})),
        (
            "valueCodableQuantity",
            json!({"coding": [{"code": "LP74908-2", "display": "Headache"}]}),
        ),
        ("valueString", json!("Fever")),
        ("valueBoolean", json!(false)),
    ];
    let all = [
        "valueQuantity",
        "valueCodableQuantity",
        "valueString",
        "valueBoolean",
    ];

    for (field, value) in cases {
        let body = with(head_injury(), json!({ field: value.clone() }));
        let (status, created) = post(&client, &server.url("/fhir/Observation"), &body).await;
        assert_eq!(status, StatusCode::CREATED, "{field}");
        assert_eq!(created["value"], field);

        let id = created["id"].as_str().unwrap();
        let read: Value = client
            .get(server.url(&format!("/fhir/Observation/{id}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let present: Vec<&str> = all.into_iter().filter(|f| read.get(*f).is_some()).collect();
        assert_eq!(present, vec![field]);
        assert!(read.get("value").is_none());
    }

    server.stop().await;
}

#[tokio::test]
async fn neither_value_nor_absent_reason_is_rejected() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();

    let (status, outcome) = post(&client, &server.url("/fhir/Observation"), &head_injury()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(outcome["resourceType"], "OperationOutcome");
    assert_eq!(outcome["issue"][0]["code"], "required");
    assert_eq!(
        outcome["issue"][0]["diagnostics"],
        "Both Value and Data Absent Reason Cannot be Blank"
    );
    assert_eq!(
        outcome["issue"][0]["expression"],
        json!(["value[x]", "dataAbsentReason"])
    );

    let bundle: Value = client
        .get(server.url("/fhir/Observation"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bundle["entry"], json!([]));

    server.stop().await;
}

#[tokio::test]
async fn absent_reason_alone_round_trips() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();
    let reason = json!({"coding": [{"code": "13244", "display": "Not Available"}]});

    let body = with(head_injury(), json!({"dataAbsentReason": reason.clone()}));
    let (status, created) = post(&client, &server.url("/fhir/Observation"), &body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["dataAbsentReason"], reason);
    assert!(created.get("value").is_none());

    let id = created["id"].as_str().unwrap();
    let read: Value = client
        .get(server.url(&format!("/fhir/Observation/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read["dataAbsentReason"], reason);

    server.stop().await;
}

#[tokio::test]
async fn schema_violations_are_422_with_first_message() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();
    let url = server.url("/fhir/Observation");

    let body = with(
        head_injury(),
        json!({"status": "cancelled", "valueString": "Fever"}),
    );
    let (status, outcome) = post(&client, &url, &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(outcome["issue"][0]["code"], "invalid");
    assert_eq!(
        outcome["issue"][0]["diagnostics"],
        "\"status\" must be one of [preliminary, registered, final, amended]"
    );
    assert_eq!(outcome["issue"][0]["expression"], json!(["status"]));

    let body = with(
        head_injury(),
        json!({"dataAbsentReason": {"code": "Some Code"}}),
    );
    let (status, outcome) = post(&client, &url, &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        outcome["issue"][0]["diagnostics"],
        "\"dataAbsentReason.code\" is not allowed"
    );

    let body = with(head_injury(), json!({"valueString": "ab"}));
    let (status, outcome) = post(&client, &url, &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        outcome["issue"][0]["diagnostics"],
        "\"valueString\" length must be at least 3 characters long"
    );

    server.stop().await;
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let server = common::start_server().await;
    let resp = reqwest::Client::new()
        .post(server.url("/fhir/Observation"))
        .header("content-type", "application/json")
        .body("{\"status\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["resourceType"], "OperationOutcome");
    assert_eq!(outcome["issue"][0]["code"], "invalid");

    server.stop().await;
}

#[tokio::test]
async fn request_id_is_propagated() {
    let server = common::start_server().await;
    let resp = reqwest::Client::new()
        .get(server.url("/healthz"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "req-42");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));

    server.stop().await;
}

fn hl7_body_weight() -> Value {
    json!({
        "resourceType": "Observation",
        "id": "example",
        "text": {
            "status": "generated",
            "div": "<div xmlns=\"http://www.w3.org/1999/xhtml\">Body weight 185 lbs</div>"
        },
        "status": "final",
        "category": [{
            "coding": [{
                "system": "http://hl7.org/fhir/observation-category",
                "code": "vital-signs",
                "display": "Vital Signs"
            }]
        }],
        "code": {
            "coding": [
                {"system": "http://loinc.org", "code": "29463-7", "display": "Body Weight"},
                {"system": "http://loinc.org", "code": "3141-9", "display": "Body weight Measured"},
                {"system": "http://snomed.info/sct", "code": "27113001", "display": "Body weight"},
                {"system": "http://acme.org/devices/clinical-codes", "code": "body-weight", "display": "Body Weight"}
            ]
        },
        "subject": {"reference": "Patient/example"},
        "context": {"reference": "Encounter/example"},
        "effectiveDateTime": "2016-03-28",
        "valueQuantity": {
            "value": 185,
            "unit": "lbs",
            "system": "http://unitsofmeasure.org",
            "code": "[lb_av]"
        }
    })
}

#[tokio::test]
async fn hl7_example_is_accepted_by_extended_variant() {
    let server = common::start_extended_server().await;
    let client = reqwest::Client::new();
    let url = server.url("/fhir/Observation");

    let (status, created) = post(&client, &url, &hl7_body_weight()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], "example");
    assert_eq!(created["effective"], "effectiveDateTime");
    assert_eq!(created["valueQuantity"]["code"], "[lb_av]");
    assert!(created.get("text").is_none());

    // Same id again
    let (status, outcome) = post(&client, &url, &hl7_body_weight()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(outcome["issue"][0]["code"], "conflict");

    // The id is mandatory here
    let mut without_id = hl7_body_weight();
    without_id.as_object_mut().unwrap().remove("id");
    let (status, outcome) = post(&client, &url, &without_id).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(outcome["issue"][0]["diagnostics"], "\"id\" is required");

    server.stop().await;
}

#[tokio::test]
async fn base_variant_rejects_unit_coding() {
    let server = common::start_server().await;
    let (status, outcome) = post(
        &reqwest::Client::new(),
        &server.url("/fhir/Observation"),
        &hl7_body_weight(),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        outcome["issue"][0]["diagnostics"],
        "\"valueQuantity.code\" is not allowed"
    );

    server.stop().await;
}
