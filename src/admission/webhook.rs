//! # Validating Webhook
//!
//! Axum adapter between the API server's `AdmissionReview` protocol and
//! [`AdmissionValidator`].
//!
//! - POST `/validate-namespacelabel` - validate NamespaceLabel create/update/delete

use super::{AdmissionValidator, ValidationError};
use crate::constants::WEBHOOK_PATH;
use crate::crd::NamespaceLabel;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation},
    DynamicObject, TypeMeta,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Create the webhook router
pub fn webhook_router(validator: Arc<AdmissionValidator>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(validate_handler))
        .route("/healthz", get(|| async { "OK" }))
        .with_state(validator)
        .layer(TraceLayer::new_for_http())
}

async fn validate_handler(
    State(validator): State<Arc<AdmissionValidator>>,
    body: Bytes,
) -> Json<AdmissionReview<DynamicObject>> {
    // Decoded by hand so an undecodable object still gets an AdmissionReview back
    let review: AdmissionReview<NamespaceLabel> = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(e) => {
            warn!(error = %e, "Undecodable AdmissionReview");
            return Json(undecodable(&body, &e));
        }
    };
    let request: AdmissionRequest<NamespaceLabel> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Invalid AdmissionReview");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    debug!(
        uid = request.uid.as_str(),
        operation = ?request.operation,
        namespace = request.namespace.as_deref().unwrap_or_default(),
        name = request.name.as_str(),
        "admission.request"
    );

    let response = AdmissionResponse::from(&request);
    let result = match request.operation {
        Operation::Create => match scoped_object(request.object.as_ref(), &request) {
            Some(candidate) => validator.validate_create(&candidate).await,
            None => return Json(missing_object(response)),
        },
        Operation::Update => match scoped_object(request.object.as_ref(), &request) {
            Some(candidate) => {
                let previous = scoped_object(request.old_object.as_ref(), &request);
                validator.validate_update(&candidate, previous.as_ref())
            }
            None => return Json(missing_object(response)),
        },
        Operation::Delete => {
            let previous = scoped_object(request.old_object.as_ref(), &request);
            validator.validate_delete(previous.as_ref())
        }
        Operation::Connect => Ok(()),
    };

    Json(respond(response, result).into_review())
}

/// Copy of the request object with its namespace filled in from the request
///
/// Objects created without an explicit namespace reach admission with an
/// empty `metadata.namespace`.
fn scoped_object(
    object: Option<&NamespaceLabel>,
    request: &AdmissionRequest<NamespaceLabel>,
) -> Option<NamespaceLabel> {
    let mut object = object?.clone();
    if object.metadata.namespace.is_none() {
        object.metadata.namespace.clone_from(&request.namespace);
    }
    if object.metadata.name.is_none() && !request.name.is_empty() {
        object.metadata.name = Some(request.name.clone());
    }
    Some(object)
}

/// `invalid` review for a body that did not decode, echoing the request uid when readable
fn undecodable(body: &[u8], error: &serde_json::Error) -> AdmissionReview<DynamicObject> {
    let mut response = AdmissionResponse::invalid(error.to_string());
    if let Some(uid) = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|raw| raw.pointer("/request/uid").and_then(Value::as_str).map(str::to_string))
    {
        response.uid = uid;
    }
    response.types = TypeMeta {
        api_version: "admission.k8s.io/v1".to_string(),
        kind: "AdmissionReview".to_string(),
    };
    response.into_review()
}

fn missing_object(response: AdmissionResponse) -> AdmissionReview<DynamicObject> {
    response
        .deny("admission request carries no NamespaceLabel object")
        .into_review()
}

fn respond(response: AdmissionResponse, result: Result<(), ValidationError>) -> AdmissionResponse {
    match result {
        Ok(()) => response,
        Err(e) => response.deny(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::ProtectedDomains;
    use crate::store::InMemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn router() -> Router {
        let store = Arc::new(InMemoryStore::new());
        webhook_router(Arc::new(AdmissionValidator::new(
            store,
            ProtectedDomains::parse("kubernetes.io"),
        )))
    }

    fn review(operation: &str, labels: Value) -> Value {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "labels.octopilot.io", "version": "v1alpha1", "kind": "NamespaceLabel"},
                "resource": {"group": "labels.octopilot.io", "version": "v1alpha1", "resource": "namespacelabels"},
                "name": "labels",
                "namespace": "team-a",
                "operation": operation,
                "userInfo": {"username": "tester"},
                "dryRun": false,
                "object": {
                    "apiVersion": "labels.octopilot.io/v1alpha1",
                    "kind": "NamespaceLabel",
                    "metadata": {"name": "labels"},
                    "spec": {"labels": labels}
                }
            }
        })
    }

    async fn post_review(body: &Value) -> (StatusCode, Value) {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(WEBHOOK_PATH)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_allows_plain_labels() {
        let (status, body) = post_review(&review("CREATE", json!({"team": "a"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"]["allowed"], json!(true));
        assert_eq!(body["response"]["uid"], json!("705ab4f5-6393-11e8-b7cc-42010a800002"));
    }

    #[tokio::test]
    async fn test_denies_protected_domain() {
        let (_, body) = post_review(&review("UPDATE", json!({"kubernetes.io/x": "1"}))).await;
        assert_eq!(body["response"]["allowed"], json!(false));
        let message = body["response"]["status"]["message"].as_str().unwrap();
        assert!(message.contains("kubernetes.io"));
    }

    #[tokio::test]
    async fn test_delete_is_allowed() {
        let mut body = review("DELETE", json!({"kubernetes.io/x": "1"}));
        let object = body["request"]["object"].take();
        body["request"]["oldObject"] = object;
        let (_, body) = post_review(&body).await;
        assert_eq!(body["response"]["allowed"], json!(true));
    }

    #[tokio::test]
    async fn test_review_without_request_is_invalid() {
        let body = json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"});
        let (status, body) = post_review(&body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"]["allowed"], json!(false));
    }

    #[tokio::test]
    async fn test_undecodable_object_is_invalid() {
        let (status, body) = post_review(&review("CREATE", json!({"a": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], json!("AdmissionReview"));
        assert_eq!(body["response"]["allowed"], json!(false));
        assert_eq!(body["response"]["uid"], json!("705ab4f5-6393-11e8-b7cc-42010a800002"));
        let message = body["response"]["status"]["message"].as_str().unwrap();
        assert!(message.contains("invalid type"));
    }
}
