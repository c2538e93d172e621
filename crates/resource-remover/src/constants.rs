pub const SKIP_ANNOTATION: &str = "resource-remover.nais.io/skip";
pub const REQUESTS_SCALED_ANNOTATION: &str = "resource-remover.nais.io/requests-scaled";
pub const SAFE_TO_EVICT_ANNOTATION: &str = "cluster-autoscaler.kubernetes.io/safe-to-evict";

pub const RESOURCE_CPU: &str = "cpu";
pub const RESOURCE_MEMORY: &str = "memory";

pub const DEFAULT_EXCLUDED_NAMESPACE: &str = "kube-system";
pub const DEFAULT_CPU_REQUEST_FLOOR_MILLIS: u64 = 1;
pub const DEFAULT_MEMORY_REQUEST_FLOOR_BYTES: u64 = 1024 * 1024;
