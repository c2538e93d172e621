use json_patch::PatchOperation;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{set_spec_field, GeneratePatches};
use crate::{errors::MutationError, policy::MutationPolicy};

/// The replica bounds of a HorizontalPodAutoscaler. These fields have the
/// same shape in `autoscaling/v1`, `v2`, `v2beta1` and `v2beta2`, everything
/// else is ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalPodAutoscaler {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<HorizontalPodAutoscalerSpec>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalPodAutoscalerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,
}

impl GeneratePatches for HorizontalPodAutoscaler {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    /// Pin the autoscaler to a single replica.
    fn generate_patches(
        &self,
        _policy: &MutationPolicy,
    ) -> Result<Vec<PatchOperation>, MutationError> {
        let Some(spec) = &self.spec else {
            return Ok(Vec::new());
        };

        let mut patches: Vec<PatchOperation> = set_spec_field("minReplicas", spec.min_replicas, 1)
            .into_iter()
            .collect();

        // maxReplicas is a required field: it is never added
        if spec.max_replicas.is_some_and(|max| max != 1) {
            patches.extend(set_spec_field("maxReplicas", spec.max_replicas, 1));
        }

        if !patches.is_empty() {
            info!("disabling HorizontalPodAutoscaler by setting minReplicas and maxReplicas to 1");
        }

        Ok(patches)
    }
}
