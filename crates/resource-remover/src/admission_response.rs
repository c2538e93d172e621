use base64::{engine::general_purpose, Engine as _};
use json_patch::PatchOperation;
use serde::{Deserialize, Serialize};

use crate::errors::MutationError;

/// This models the admission/v1/AdmissionResponse object of Kubernetes.
/// See https://pkg.go.dev/k8s.io/kubernetes/pkg/apis/admission#AdmissionResponse
///
/// The webhook never rejects a request, hence there's no `status` field.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// UID is an identifier for the individual request/response.
    /// This must be copied over from the corresponding AdmissionRequest.
    pub uid: String,

    /// Allowed indicates whether or not the admission request was permitted.
    pub allowed: bool,

    /// The type of Patch. Currently we only allow "JSONPatch".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,

    /// The base64 encoded patch body, a JSON Patch as defined by RFC 6902.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

/// PatchType is the type of patch being used to represent the mutated object
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub enum PatchType {
    #[serde(rename = "JSONPatch")]
    #[default]
    JSONPatch,
}

impl AdmissionResponse {
    /// Let the object through untouched.
    pub fn allow(uid: String) -> AdmissionResponse {
        AdmissionResponse {
            uid,
            allowed: true,
            ..Default::default()
        }
    }

    /// Let the object through, applying the given operations. An empty list
    /// of operations produces the same response as [`AdmissionResponse::allow`].
    pub fn allow_with_patch(
        uid: String,
        operations: &[PatchOperation],
    ) -> Result<AdmissionResponse, MutationError> {
        if operations.is_empty() {
            return Ok(AdmissionResponse::allow(uid));
        }

        let patch = serde_json::to_vec(operations)
            .map(|bytes| general_purpose::STANDARD.encode(bytes))
            .map_err(MutationError::SerializePatch)?;

        Ok(AdmissionResponse {
            uid,
            allowed: true,
            patch_type: Some(PatchType::JSONPatch),
            patch: Some(patch),
        })
    }

    /// Decode the JSON Patch carried by the response.
    pub fn decoded_patch(&self) -> Option<json_patch::Patch> {
        let encoded = self.patch.as_ref()?;
        let bytes = general_purpose::STANDARD.decode(encoded).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
