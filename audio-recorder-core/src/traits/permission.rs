/// Microphone permission.
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self) -> bool;

    /// Ask the user. Blocks until answered and returns the answer.
    fn request(&self) -> bool;
}

/// Permission with a fixed answer, for hosts without a permission prompt.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub bool);

impl StaticPermission {
    pub fn granted() -> Self {
        Self(true)
    }

    pub fn denied() -> Self {
        Self(false)
    }
}

impl PermissionGate for StaticPermission {
    fn is_granted(&self) -> bool {
        self.0
    }

    fn request(&self) -> bool {
        self.0
    }
}
