use crate::api::{
    client::ClientError,
    models::{ApprovalRequest, FeatureFlag, RepositoryStatistic},
};

/// The operations the migrator needs from the flag management service. Every call is
/// scoped to the project and environment the implementation was built for.
pub trait FlagService {
    /// All flags in the project, with full targeting for the environment.
    fn list_flags(&self) -> Result<Vec<FeatureFlag>, ClientError>;

    /// Keys of the flags that list `flag_key` as a prerequisite.
    fn dependent_flags(&self, flag_key: &str) -> Result<Vec<String>, ClientError>;

    /// Per-repository code reference statistics. Empty when the flag has no references.
    fn code_reference_statistics(
        &self,
        flag_key: &str,
    ) -> Result<Vec<RepositoryStatistic>, ClientError>;

    /// Number of running experiments that use `flag_key`.
    fn running_experiments(&self, flag_key: &str) -> Result<u64, ClientError>;

    fn submit_approval_request(
        &self,
        flag_key: &str,
        request: &ApprovalRequest,
    ) -> Result<(), ClientError>;
}
