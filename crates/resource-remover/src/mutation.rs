use std::{fmt, str::FromStr};

use json_patch::PatchOperation;
use k8s_openapi::api::core::v1::Pod;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn, Span};

use crate::{
    admission_request::{AdmissionRequest, GroupVersionKind},
    admission_response::AdmissionResponse,
    errors::MutationError,
    patch::{hpa::HorizontalPodAutoscaler, replicas::ReplicatedWorkload, GeneratePatches},
    policy::MutationPolicy,
    skip::should_skip,
};

/// The HTTP endpoints exposed by the webhook, each one dedicated to a family
/// of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    Pods,
    HorizontalPodAutoscalers,
    Replicas,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [
        Endpoint::Pods,
        Endpoint::HorizontalPodAutoscalers,
        Endpoint::Replicas,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Pods => "/mutate",
            Endpoint::HorizontalPodAutoscalers => "/mutate-hpa",
            Endpoint::Replicas => "/mutate-replicas",
        }
    }

    /// Name used to enable the endpoint from the command line
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Pods => "pods",
            Endpoint::HorizontalPodAutoscalers => "hpa",
            Endpoint::Replicas => "replicas",
        }
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .into_iter()
            .find(|endpoint| endpoint.name() == s.trim())
            .ok_or_else(|| format!("unknown endpoint \"{s}\""))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of object carried by an admission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Pod,
    HorizontalPodAutoscaler,
    Deployment,
    StatefulSet,
    Other(GroupVersionKind),
}

impl From<&GroupVersionKind> for ObjectKind {
    fn from(gvk: &GroupVersionKind) -> Self {
        match (gvk.group.as_str(), gvk.kind.as_str()) {
            ("", "Pod") => ObjectKind::Pod,
            ("autoscaling", "HorizontalPodAutoscaler") => ObjectKind::HorizontalPodAutoscaler,
            ("apps" | "extensions", "Deployment") => ObjectKind::Deployment,
            ("apps", "StatefulSet") => ObjectKind::StatefulSet,
            _ => ObjectKind::Other(gvk.clone()),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Pod => f.write_str("Pod"),
            ObjectKind::HorizontalPodAutoscaler => f.write_str("HorizontalPodAutoscaler"),
            ObjectKind::Deployment => f.write_str("Deployment"),
            ObjectKind::StatefulSet => f.write_str("StatefulSet"),
            ObjectKind::Other(gvk) if gvk.group.is_empty() => {
                write!(f, "{}/{}", gvk.version, gvk.kind)
            }
            ObjectKind::Other(gvk) => write!(f, "{}/{}/{}", gvk.group, gvk.version, gvk.kind),
        }
    }
}

/// Compute the admission response for a request received on `endpoint`.
///
/// The response always allows the request. An error means the request could
/// not be understood, or the response could not be built.
pub fn mutate(
    endpoint: Endpoint,
    request: &AdmissionRequest,
    policy: &MutationPolicy,
) -> Result<AdmissionResponse, MutationError> {
    let kind = ObjectKind::from(&request.kind);

    let operations = match (endpoint, &kind) {
        (Endpoint::Pods, ObjectKind::Pod) => review::<Pod>(request, &kind, policy)?,
        (Endpoint::HorizontalPodAutoscalers, ObjectKind::HorizontalPodAutoscaler) => {
            review::<HorizontalPodAutoscaler>(request, &kind, policy)?
        }
        (Endpoint::Replicas, ObjectKind::Deployment) => {
            review::<ReplicatedWorkload>(request, &kind, policy)?
        }
        (Endpoint::Replicas, ObjectKind::StatefulSet) => {
            let (namespace, name) = record_identity(
                request.namespace.as_deref().unwrap_or_default(),
                request.name.as_deref().unwrap_or_default(),
            );
            info!(namespace, name, "StatefulSet replicas are never changed, allowing unchanged");
            Vec::new()
        }
        _ => {
            record_identity(
                request.namespace.as_deref().unwrap_or_default(),
                request.name.as_deref().unwrap_or_default(),
            );
            warn!(
                kind = %kind,
                endpoint = endpoint.path(),
                "kind not handled by this endpoint, allowing unchanged"
            );
            Vec::new()
        }
    };

    Span::current().record("patch_operations", operations.len());

    AdmissionResponse::allow_with_patch(request.uid.clone(), &operations)
}

/// Decode the object and compute its patch. An empty list means the object
/// is let through unchanged.
fn review<T>(
    request: &AdmissionRequest,
    kind: &ObjectKind,
    policy: &MutationPolicy,
) -> Result<Vec<PatchOperation>, MutationError>
where
    T: DeserializeOwned + GeneratePatches,
{
    let Some(object) = request.object.as_ref().map(|raw| &raw.0).filter(|o| !o.is_null()) else {
        record_identity(
            request.namespace.as_deref().unwrap_or_default(),
            request.name.as_deref().unwrap_or_default(),
        );
        debug!(kind = %kind, "no object inside of the request, allowing unchanged");
        return Ok(Vec::new());
    };

    let target = decode::<T>(object, kind)?;
    let metadata = target.metadata();

    // Pods created by a controller usually have no namespace inside of
    // the object, only inside of the request. Their name is not known yet
    // either, only the generateName prefix.
    let (namespace, name) = record_identity(
        request
            .namespace
            .as_deref()
            .filter(|namespace| !namespace.is_empty())
            .or(metadata.namespace.as_deref())
            .unwrap_or_default(),
        metadata
            .name
            .as_deref()
            .or(request.name.as_deref())
            .or(metadata.generate_name.as_deref())
            .unwrap_or_default(),
    );

    if policy.is_namespace_excluded(namespace) {
        info!(namespace, name, kind = %kind, "namespace is excluded, allowing unchanged");
        return Ok(Vec::new());
    }

    if should_skip(metadata.annotations.as_ref(), namespace, name) {
        return Ok(Vec::new());
    }

    let operations = target.generate_patches(policy)?;
    debug!(
        namespace,
        name,
        kind = %kind,
        patch = %serde_json::to_string(&operations).unwrap_or_default(),
        "patch generated"
    );

    Ok(operations)
}

/// Record the identity of the object on the request span, every log line
/// emitted while computing the patch carries it.
fn record_identity<'a>(namespace: &'a str, name: &'a str) -> (&'a str, &'a str) {
    let span = Span::current();
    span.record("namespace", namespace);
    span.record("name", name);
    (namespace, name)
}

fn decode<T: DeserializeOwned>(object: &Value, kind: &ObjectKind) -> Result<T, MutationError> {
    T::deserialize(object).map_err(|source| MutationError::DecodeObject {
        kind: kind.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SKIP_ANNOTATION;
    use rstest::rstest;
    use serde_json::json;

    fn request(kind: (&str, &str, &str), namespace: &str, object: Value) -> AdmissionRequest {
        serde_json::from_value(json!({
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": kind.0, "version": kind.1, "kind": kind.2},
            "namespace": namespace,
            "operation": "CREATE",
            "object": object,
        }))
        .unwrap()
    }

    fn pod(annotations: Value) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"generateName": "app-7d4b9c-", "annotations": annotations},
            "spec": {
                "containers": [{
                    "name": "app",
                    "resources": {"requests": {"cpu": "100m"}, "limits": {"cpu": "1"}}
                }]
            }
        })
    }

    const POD: (&str, &str, &str) = ("", "v1", "Pod");

    #[test]
    fn pod_is_patched() {
        let request = request(POD, "aura", pod(json!({})));

        let response = mutate(Endpoint::Pods, &request, &MutationPolicy::default()).unwrap();

        assert!(response.allowed);
        assert_eq!(response.uid, request.uid);
        let patch = serde_json::to_value(response.decoded_patch().unwrap()).unwrap();
        assert_eq!(
            patch,
            json!([
                {"op": "replace", "path": "/spec/containers/0/resources/requests/cpu", "value": "20m"},
                {"op": "remove", "path": "/spec/containers/0/resources/limits/cpu"},
                {"op": "add", "path": "/metadata/annotations/resource-remover.nais.io~1requests-scaled", "value": "1/5"},
            ])
        );
    }

    #[rstest]
    #[case::pod(Endpoint::Pods, POD, pod(json!({SKIP_ANNOTATION: "true"})))]
    #[case::hpa(
        Endpoint::HorizontalPodAutoscalers,
        ("autoscaling", "v2", "HorizontalPodAutoscaler"),
        json!({"metadata": {"name": "app", "annotations": {SKIP_ANNOTATION: "true"}}, "spec": {"maxReplicas": 5}})
    )]
    #[case::deployment(
        Endpoint::Replicas,
        ("apps", "v1", "Deployment"),
        json!({"metadata": {"name": "app", "annotations": {SKIP_ANNOTATION: "true"}}, "spec": {"replicas": 3}})
    )]
    fn skip_annotation_allows_unchanged(
        #[case] endpoint: Endpoint,
        #[case] kind: (&str, &str, &str),
        #[case] object: Value,
    ) {
        let request = request(kind, "aura", object);

        let response = mutate(endpoint, &request, &MutationPolicy::default()).unwrap();

        assert_eq!(response, AdmissionResponse::allow(request.uid.clone()));
    }

    #[test]
    fn skip_annotation_must_be_exactly_true() {
        let request = request(POD, "aura", pod(json!({SKIP_ANNOTATION: "True"})));

        let response = mutate(Endpoint::Pods, &request, &MutationPolicy::default()).unwrap();

        assert!(response.patch.is_some());
    }

    #[test]
    fn excluded_namespace_wins_over_everything() {
        let request = request(POD, "kube-system", pod(json!({SKIP_ANNOTATION: "false"})));

        let response = mutate(Endpoint::Pods, &request, &MutationPolicy::default()).unwrap();

        assert_eq!(response, AdmissionResponse::allow(request.uid.clone()));
    }

    #[rstest]
    #[case::pod(Endpoint::Pods, POD, pod(json!({})))]
    #[case::hpa(
        Endpoint::HorizontalPodAutoscalers,
        ("autoscaling", "v2", "HorizontalPodAutoscaler"),
        json!({"metadata": {"name": "coredns"}, "spec": {"maxReplicas": 5}})
    )]
    #[case::deployment(
        Endpoint::Replicas,
        ("apps", "v1", "Deployment"),
        json!({"metadata": {"name": "coredns"}, "spec": {"replicas": 3}})
    )]
    fn excluded_namespace_on_every_endpoint(
        #[case] endpoint: Endpoint,
        #[case] kind: (&str, &str, &str),
        #[case] object: Value,
    ) {
        // the same object is patched anywhere else
        let elsewhere = request(kind, "aura", object.clone());
        let response = mutate(endpoint, &elsewhere, &MutationPolicy::default()).unwrap();
        assert!(response.patch.is_some());

        let request = request(kind, "kube-system", object);
        let response = mutate(endpoint, &request, &MutationPolicy::default()).unwrap();

        assert_eq!(response, AdmissionResponse::allow(request.uid.clone()));
    }

    #[test]
    fn object_namespace_is_used_when_request_has_none() {
        let mut object = pod(json!({}));
        object["metadata"]["namespace"] = json!("monitoring");
        let request = request(POD, "", object);
        let policy = MutationPolicy {
            excluded_namespaces: ["monitoring".to_owned()].into(),
            ..Default::default()
        };

        let response = mutate(Endpoint::Pods, &request, &policy).unwrap();

        assert_eq!(response, AdmissionResponse::allow(request.uid.clone()));
    }

    #[test]
    fn statefulsets_never_get_a_replica_patch() {
        let request = request(
            ("apps", "v1", "StatefulSet"),
            "aura",
            json!({"metadata": {"name": "db"}, "spec": {"replicas": 3}}),
        );

        let response = mutate(Endpoint::Replicas, &request, &MutationPolicy::default()).unwrap();

        assert_eq!(response, AdmissionResponse::allow(request.uid.clone()));
    }

    #[test]
    fn deployment_replicas_are_reset() {
        let request = request(
            ("apps", "v1", "Deployment"),
            "aura",
            json!({"metadata": {"name": "app"}, "spec": {"replicas": 3}}),
        );

        let response = mutate(Endpoint::Replicas, &request, &MutationPolicy::default()).unwrap();

        assert_eq!(
            serde_json::to_value(response.decoded_patch().unwrap()).unwrap(),
            json!([{"op": "replace", "path": "/spec/replicas", "value": 1}])
        );
    }

    #[test]
    fn unexpected_kind_is_allowed_unchanged() {
        let request = request(
            ("apps", "v1", "Deployment"),
            "aura",
            json!({"metadata": {"name": "app"}, "spec": {"replicas": 3}}),
        );

        let response = mutate(Endpoint::Pods, &request, &MutationPolicy::default()).unwrap();

        assert_eq!(response, AdmissionResponse::allow(request.uid.clone()));
    }

    #[test]
    fn missing_object_is_allowed_unchanged() {
        let request = request(POD, "aura", Value::Null);

        let response = mutate(Endpoint::Pods, &request, &MutationPolicy::default()).unwrap();

        assert_eq!(response, AdmissionResponse::allow(request.uid.clone()));
    }

    #[test]
    fn malformed_object_is_an_error() {
        let request = request(POD, "aura", json!({"spec": {"containers": "nope"}}));

        let error = mutate(Endpoint::Pods, &request, &MutationPolicy::default()).unwrap_err();

        assert!(matches!(error, MutationError::DecodeObject { .. }));
    }

    #[rstest]
    #[case(("", "v1", "Pod"), ObjectKind::Pod)]
    #[case(("autoscaling", "v1", "HorizontalPodAutoscaler"), ObjectKind::HorizontalPodAutoscaler)]
    #[case(("autoscaling", "v2beta2", "HorizontalPodAutoscaler"), ObjectKind::HorizontalPodAutoscaler)]
    #[case(("apps", "v1", "Deployment"), ObjectKind::Deployment)]
    #[case(("apps", "v1", "StatefulSet"), ObjectKind::StatefulSet)]
    fn object_kinds(#[case] gvk: (&str, &str, &str), #[case] expected: ObjectKind) {
        let gvk = GroupVersionKind {
            group: gvk.0.to_owned(),
            version: gvk.1.to_owned(),
            kind: gvk.2.to_owned(),
        };
        assert_eq!(ObjectKind::from(&gvk), expected);
    }

    #[test]
    fn endpoint_names() {
        assert_eq!("hpa".parse::<Endpoint>().unwrap(), Endpoint::HorizontalPodAutoscalers);
        assert!("statefulsets".parse::<Endpoint>().is_err());
        assert_eq!(Endpoint::Replicas.path(), "/mutate-replicas");
    }
}
