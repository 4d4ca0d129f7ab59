use std::fmt;

/// Whether a query is satisfied by the current entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    Inactive,
}

impl From<bool> for Activity {
    fn from(active: bool) -> Self {
        if active {
            Activity::Active
        } else {
            Activity::Inactive
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Active => write!(f, "active"),
            Activity::Inactive => write!(f, "inactive"),
        }
    }
}

/// Which tag mutation to apply to the running entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    Add,
    Remove,
    Toggle,
}

impl fmt::Display for TagAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagAction::Add => write!(f, "add_tag"),
            TagAction::Remove => write!(f, "remove_tag"),
            TagAction::Toggle => write!(f, "toggle_tag"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_from_bool() {
        assert_eq!(Activity::from(true), Activity::Active);
        assert_eq!(Activity::from(false), Activity::Inactive);
    }

    #[test]
    fn test_activity_display() {
        assert_eq!(Activity::Active.to_string(), "active");
        assert_eq!(Activity::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_tag_action_display() {
        assert_eq!(TagAction::Add.to_string(), "add_tag");
        assert_eq!(TagAction::Remove.to_string(), "remove_tag");
        assert_eq!(TagAction::Toggle.to_string(), "toggle_tag");
    }
}
