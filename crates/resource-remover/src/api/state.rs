use crate::policy::MutationPolicy;

pub(crate) struct ApiServerState {
    pub(crate) policy: MutationPolicy,
}
