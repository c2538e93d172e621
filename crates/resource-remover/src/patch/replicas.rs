use json_patch::PatchOperation;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{set_spec_field, GeneratePatches};
use crate::{errors::MutationError, policy::MutationPolicy};

/// A workload exposing `spec.replicas`. Only Deployments are routed here:
/// the replicas of a StatefulSet are not interchangeable, so they are never
/// scaled down by this webhook.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicatedWorkload {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ReplicatedWorkloadSpec>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicatedWorkloadSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

impl GeneratePatches for ReplicatedWorkload {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn generate_patches(
        &self,
        _policy: &MutationPolicy,
    ) -> Result<Vec<PatchOperation>, MutationError> {
        let Some(spec) = &self.spec else {
            return Ok(Vec::new());
        };

        let patches: Vec<PatchOperation> = set_spec_field("replicas", spec.replicas, 1)
            .into_iter()
            .collect();
        if !patches.is_empty() {
            info!(replicas = spec.replicas, "setting replicas to 1");
        }

        Ok(patches)
    }
}
