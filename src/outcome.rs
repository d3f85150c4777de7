use std::fmt::Display;

/// Result of a step that never fails outright: either the real value, or a
/// substitute plus the reason the real one could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Fresh(T),
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    #[inline]
    #[must_use]
    pub fn degraded(value: T, reason: impl Display) -> Self {
        Self::Degraded {
            value,
            reason: reason.to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Fresh(value) | Self::Degraded { value, .. } => value,
        }
    }

    #[inline]
    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::Fresh(value) | Self::Degraded { value, .. } => value,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Fresh(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}
