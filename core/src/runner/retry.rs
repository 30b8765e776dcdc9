/// Total spawns allowed for a task with `retries` retries.
pub fn max_attempts(retries: u32) -> u32 {
    retries.saturating_add(1).max(1)
}

/// Whether another attempt may follow attempt number `attempt` (1-based).
pub fn has_attempts_left(attempt: u32, retries: u32) -> bool {
    attempt < max_attempts(retries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_default_and_retry() {
        assert_eq!(max_attempts(0), 1);
        assert_eq!(max_attempts(2), 3);
        assert_eq!(max_attempts(u32::MAX), u32::MAX);
    }

    #[test]
    fn attempts_left() {
        assert!(has_attempts_left(1, 2));
        assert!(has_attempts_left(2, 2));
        assert!(!has_attempts_left(3, 2));
        assert!(!has_attempts_left(1, 0));
    }
}
