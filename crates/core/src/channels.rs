//! Fanout channel names.

use crate::types::UserId;

/// Channel every curator session joins; receives all record events.
pub const CHANNEL_CURATORS: &str = "curators";

/// Per-owner channel a support session joins after authenticating.
pub fn support_channel(user_id: &UserId) -> String {
    format!("support:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_channel_is_scoped_by_user() {
        assert_eq!(support_channel(&"u1".to_string()), "support:u1");
        assert_ne!(support_channel(&"u1".to_string()), support_channel(&"u2".to_string()));
    }
}
