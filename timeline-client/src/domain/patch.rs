/// Sparse field update for a configuration period.
///
/// `Unset` is distinct from `Keep`: detaching a meter from a sharing
/// operation must write an explicit NULL, not merely omit the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Unset,
    Set(T),
}

impl<T> Patch<T> {
    /// Resolve against the current value of the field.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Unset => None,
            Patch::Set(v) => Some(v),
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }
}
