//! Records held by an [`EntityStore`](crate::store::EntityStore).

/// A server record addressable by a string id.
///
/// `Patch` is the partial-update shape used for shallow merges. Converting a
/// full record into a patch must set every field, so merging it replaces the
/// stored copy field by field.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Partial-update shape for this record.
    type Patch: From<Self> + Clone + Send + 'static;

    /// Stable record id.
    fn id(&self) -> &str;

    /// Id targeted by a patch.
    fn patch_id(patch: &Self::Patch) -> &str;

    /// Shallow-merge the fields present in `patch`.
    fn apply_patch(&mut self, patch: Self::Patch);
}
