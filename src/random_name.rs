use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

/// Distinguishes names generated within the same clock tick.
static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Represents a randomly generated file name.
pub(crate) struct RandomName {
    name: String,
}

impl RandomName {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        let pid = std::process::id();

        // Using the address of a local variable for extra variation.
        let marker = &pid as *const _ as usize;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(std::time::Duration::from_secs(0));
        let (secs, subsec_nanos) = (now.as_secs(), now.subsec_nanos());

        Self {
            name: format!(
                "{}{}{:x}{:x}{:x}{:x}{}",
                prefix, pid, marker, secs, subsec_nanos, seq, suffix
            ),
        }
    }
}

impl AsRef<str> for RandomName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_name() {
        let name = RandomName::new("test", ".tmp");
        assert!(name.as_ref().starts_with("test"));
        assert!(name.as_ref().ends_with(".tmp"));
    }

    #[test]
    fn test_consecutive_names_differ() {
        let a = RandomName::new("test", ".tmp");
        let b = RandomName::new("test", ".tmp");
        assert_ne!(a.as_ref(), b.as_ref());
    }
}
