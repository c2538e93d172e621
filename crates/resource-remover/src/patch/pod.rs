use json_patch::PatchOperation;
use k8s_openapi::{
    api::core::v1::{Container, Pod},
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta},
};
use serde_json::{json, Value};
use tracing::info;

use super::{add, json_pointer, remove, replace, GeneratePatches};
use crate::{
    constants::{REQUESTS_SCALED_ANNOTATION, RESOURCE_CPU, RESOURCE_MEMORY, SAFE_TO_EVICT_ANNOTATION},
    errors::{MutationError, QuantityError},
    policy::MutationPolicy,
    quantity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Cpu,
    Memory,
}

impl Resource {
    const ALL: [Resource; 2] = [Resource::Cpu, Resource::Memory];

    fn key(self) -> &'static str {
        match self {
            Resource::Cpu => RESOURCE_CPU,
            Resource::Memory => RESOURCE_MEMORY,
        }
    }

    /// Millicores for cpu, bytes for memory
    fn amount(self, quantity: &Quantity) -> Result<u64, QuantityError> {
        match self {
            Resource::Cpu => quantity::cpu_millis(quantity),
            Resource::Memory => quantity::memory_bytes(quantity),
        }
    }

    fn scaled(self, amount: u64, policy: &MutationPolicy) -> u64 {
        match self {
            Resource::Cpu => policy.scaled_cpu_request(amount),
            Resource::Memory => policy.scaled_memory_request(amount),
        }
    }

    fn quantity(self, amount: u64) -> Quantity {
        match self {
            Resource::Cpu => quantity::cpu_quantity(amount),
            Resource::Memory => quantity::memory_quantity(amount),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerList {
    Containers,
    InitContainers,
}

impl ContainerList {
    fn field(self) -> &'static str {
        match self {
            ContainerList::Containers => "containers",
            ContainerList::InitContainers => "initContainers",
        }
    }

    fn description(self) -> &'static str {
        match self {
            ContainerList::Containers => "container",
            ContainerList::InitContainers => "init container",
        }
    }
}

fn resource_path(
    list: ContainerList,
    index: usize,
    section: &str,
    resource: Resource,
) -> json_patch::jsonptr::PointerBuf {
    json_pointer([
        "spec",
        list.field(),
        index.to_string().as_str(),
        "resources",
        section,
        resource.key(),
    ])
}

/// Pods whose requests get scaled are stamped with the requests-scaled
/// annotation, and the requests of a stamped pod are left as they are, so
/// running the generator on its own output yields an empty patch.
impl GeneratePatches for Pod {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn generate_patches(
        &self,
        policy: &MutationPolicy,
    ) -> Result<Vec<PatchOperation>, MutationError> {
        let mut patches = Vec::new();
        let annotations = self.metadata.annotations.as_ref();

        if annotations
            .and_then(|annotations| annotations.get(SAFE_TO_EVICT_ANNOTATION))
            .is_some_and(|value| value == "false")
        {
            info!("removing {SAFE_TO_EVICT_ANNOTATION}=false annotation");
            patches.push(remove(json_pointer([
                "metadata",
                "annotations",
                SAFE_TO_EVICT_ANNOTATION,
            ])));
        }

        let already_scaled =
            annotations.is_some_and(|annotations| annotations.contains_key(REQUESTS_SCALED_ANNOTATION));
        let mut scaled_requests = false;

        if let Some(spec) = &self.spec {
            let lists = [
                (ContainerList::Containers, spec.containers.as_slice()),
                (
                    ContainerList::InitContainers,
                    spec.init_containers.as_deref().unwrap_or_default(),
                ),
            ];
            for (list, containers) in lists {
                for (index, container) in containers.iter().enumerate() {
                    scaled_requests |= request_patches(
                        list,
                        index,
                        container,
                        policy,
                        already_scaled,
                        &mut patches,
                    )?;
                    limit_patches(list, index, container, &mut patches);
                }
            }
        }

        if scaled_requests {
            let ratio = Value::from(policy.request_ratio.to_string());
            match annotations {
                Some(_) => patches.push(add(
                    json_pointer(["metadata", "annotations", REQUESTS_SCALED_ANNOTATION]),
                    ratio,
                )),
                None => patches.push(add(
                    json_pointer(["metadata", "annotations"]),
                    json!({ REQUESTS_SCALED_ANNOTATION: ratio }),
                )),
            }
        }

        Ok(patches)
    }
}

/// Scale down, or remove, the cpu and memory requests of a container.
/// Returns whether a request has been scaled.
fn request_patches(
    list: ContainerList,
    index: usize,
    container: &Container,
    policy: &MutationPolicy,
    already_scaled: bool,
    patches: &mut Vec<PatchOperation>,
) -> Result<bool, MutationError> {
    let Some(requests) = container
        .resources
        .as_ref()
        .and_then(|resources| resources.requests.as_ref())
    else {
        return Ok(false);
    };

    let removes_requests = policy.request_ratio.removes_requests();
    if already_scaled && !removes_requests {
        return Ok(false);
    }

    let mut scaled = false;
    for resource in Resource::ALL {
        let Some(current) = requests.get(resource.key()) else {
            continue;
        };
        let path = resource_path(list, index, "requests", resource);

        if removes_requests {
            patches.push(remove(path));
            continue;
        }

        let amount = resource
            .amount(current)
            .map_err(|source| MutationError::InvalidQuantity {
                container: container.name.clone(),
                resource: resource.key().to_owned(),
                field: "requests",
                source,
            })?;
        let desired = resource.scaled(amount, policy);
        if desired != amount {
            patches.push(replace(path, json!(resource.quantity(desired))));
            scaled = true;
        }
    }

    if removes_requests {
        info!(
            container = container.name.as_str(),
            "removing requests from {}",
            list.description()
        );
    } else if scaled {
        info!(
            container = container.name.as_str(),
            ratio = %policy.request_ratio,
            "reducing requests of {}",
            list.description()
        );
    }

    Ok(scaled)
}

/// Limits are always dropped, otherwise the API server would default the
/// requests to the limits.
fn limit_patches(
    list: ContainerList,
    index: usize,
    container: &Container,
    patches: &mut Vec<PatchOperation>,
) {
    let Some(limits) = container
        .resources
        .as_ref()
        .and_then(|resources| resources.limits.as_ref())
    else {
        return;
    };

    let mut removed = false;
    for resource in Resource::ALL {
        if limits.contains_key(resource.key()) {
            patches.push(remove(resource_path(list, index, "limits", resource)));
            removed = true;
        }
    }

    if removed {
        info!(
            container = container.name.as_str(),
            "removing limits from {}",
            list.description()
        );
    }
}
