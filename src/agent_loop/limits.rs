/// Default bound on model rounds per turn.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;
/// Default bound for delegated child conversations.
pub const DEFAULT_DELEGATION_MAX_ITERATIONS: usize = 12;

/// Bounds applied to one run of the tool loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    /// Maximum number of model calls before the turn fails.
    pub max_iterations: usize,
}

impl LoopLimits {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }

    /// Limits used for delegated sub-agents.
    pub fn delegation() -> Self {
        Self::new(DEFAULT_DELEGATION_MAX_ITERATIONS)
    }
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_clamped() {
        assert_eq!(LoopLimits::new(0).max_iterations, 1);
        assert_eq!(LoopLimits::default().max_iterations, 20);
        assert_eq!(LoopLimits::delegation().max_iterations, 12);
    }
}
