//! Token usage accounting.

use serde::{Deserialize, Serialize};

/// Token usage for a generation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

impl Usage {
    /// Merge another usage into this one (accumulate).
    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
        if let Some(v) = other.cache_read_tokens {
            let slot = self.cache_read_tokens.get_or_insert(0);
            *slot = slot.saturating_add(v);
        }
        if let Some(v) = other.reasoning_tokens {
            let slot = self.reasoning_tokens.get_or_insert(0);
            *slot = slot.saturating_add(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_optional_counters() {
        let mut total = Usage::default();
        total.merge(&Usage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
            cache_read_tokens: Some(3),
            reasoning_tokens: None,
        });
        total.merge(&Usage {
            input_tokens: 1,
            output_tokens: 1,
            total_tokens: 2,
            cache_read_tokens: Some(1),
            reasoning_tokens: Some(4),
        });
        assert_eq!(total.total_tokens, 17);
        assert_eq!(total.cache_read_tokens, Some(4));
        assert_eq!(total.reasoning_tokens, Some(4));
    }

    #[test]
    fn merge_saturates_instead_of_overflowing() {
        let mut total = Usage {
            input_tokens: u32::MAX - 1,
            total_tokens: u32::MAX,
            cache_read_tokens: Some(u32::MAX),
            ..Default::default()
        };
        total.merge(&Usage {
            input_tokens: 5,
            output_tokens: 2,
            total_tokens: 7,
            cache_read_tokens: Some(1),
            reasoning_tokens: None,
        });
        assert_eq!(total.input_tokens, u32::MAX);
        assert_eq!(total.output_tokens, 2);
        assert_eq!(total.total_tokens, u32::MAX);
        assert_eq!(total.cache_read_tokens, Some(u32::MAX));
    }
}
