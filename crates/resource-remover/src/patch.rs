//! JSON Patch generation, one generator per kind of object.
//!
//! Every generator looks at the object as it was received: an operation is
//! emitted only when it changes something, `remove` and `replace` only target
//! paths that exist, `add` only targets paths that don't.

pub mod hpa;
pub mod pod;
pub mod replicas;

use json_patch::{
    jsonptr::{PointerBuf, Token},
    AddOperation, PatchOperation, RemoveOperation, ReplaceOperation,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;

use crate::{errors::MutationError, policy::MutationPolicy};

pub trait GeneratePatches {
    fn metadata(&self) -> &ObjectMeta;

    fn generate_patches(
        &self,
        policy: &MutationPolicy,
    ) -> Result<Vec<PatchOperation>, MutationError>;
}

/// Build a JSON pointer out of unescaped reference tokens. `~` and `/` inside
/// of a token are escaped as `~0` and `~1`.
pub(crate) fn json_pointer<I, S>(tokens: I) -> PointerBuf
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    PointerBuf::from_tokens(tokens.into_iter().map(|token| Token::new(token.into())))
}

pub(crate) fn add(path: PointerBuf, value: Value) -> PatchOperation {
    PatchOperation::Add(AddOperation { path, value })
}

pub(crate) fn replace(path: PointerBuf, value: Value) -> PatchOperation {
    PatchOperation::Replace(ReplaceOperation { path, value })
}

pub(crate) fn remove(path: PointerBuf) -> PatchOperation {
    PatchOperation::Remove(RemoveOperation { path })
}

/// Set a top level `spec` integer field to `desired`.
pub(crate) fn set_spec_field(
    field: &str,
    current: Option<i32>,
    desired: i32,
) -> Option<PatchOperation> {
    let path = json_pointer(["spec", field]);
    match current {
        None => Some(add(path, Value::from(desired))),
        Some(value) if value != desired => Some(replace(path, Value::from(desired))),
        Some(_) => None,
    }
}
