use crate::domain::UserId;

/// Only the configured operator may issue commands.
pub fn is_operator(user_id: Option<UserId>, operator: UserId) -> bool {
    user_id == Some(operator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_operator_is_authorized() {
        assert!(is_operator(Some(UserId(375047802)), UserId(375047802)));
        assert!(!is_operator(Some(UserId(1)), UserId(375047802)));
        assert!(!is_operator(None, UserId(375047802)));
    }
}
