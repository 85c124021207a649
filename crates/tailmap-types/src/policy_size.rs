//! input size limit for policy files

/// largest policy accepted, in bytes (1 MiB)
pub const MAX_POLICY_SIZE: usize = 1024 * 1024;

/// policy text is over [`MAX_POLICY_SIZE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("policy is {size} bytes, the limit is {limit}")]
pub struct PolicyTooLarge {
    /// size of the rejected text
    pub size: usize,
    /// the limit it exceeded
    pub limit: usize,
}

/// reject policy text over [`MAX_POLICY_SIZE`] before any parsing work.
pub fn check_policy_size(text: &str) -> Result<(), PolicyTooLarge> {
    if text.len() > MAX_POLICY_SIZE {
        return Err(PolicyTooLarge {
            size: text.len(),
            limit: MAX_POLICY_SIZE,
        });
    }
    Ok(())
}
