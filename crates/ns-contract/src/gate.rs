use ns_core::AuditResult;

/// One post-normalization stage. Implementations must be total and idempotent:
/// `apply(apply(x)) == apply(x)`.
pub trait Gate: Send + Sync {
    fn id(&self) -> &str;
    fn apply(&self, result: AuditResult) -> AuditResult;
}
