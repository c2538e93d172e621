use std::collections::BTreeMap;

use tracing::info;

use crate::constants::SKIP_ANNOTATION;

/// Objects annotated with `resource-remover.nais.io/skip: "true"` are left
/// untouched. Any other value, including `"True"`, does not count.
pub fn should_skip(
    annotations: Option<&BTreeMap<String, String>>,
    namespace: &str,
    name: &str,
) -> bool {
    let skip = annotations
        .and_then(|annotations| annotations.get(SKIP_ANNOTATION))
        .is_some_and(|value| value == "true");

    if skip {
        info!(namespace, name, "skipping object due to skip annotation");
    }

    skip
}
