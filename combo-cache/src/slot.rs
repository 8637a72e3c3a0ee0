//! Item slots for partially loaded lists.

/// A position in a lazily loaded list.
///
/// Rows whose page has not arrived yet are `Placeholder`, so a virtual list can
/// render a fixed-size skeleton before any data is present. A placeholder never
/// compares equal to a loaded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot<T> {
    /// A real item supplied by the data source.
    Loaded(T),
    /// Stand-in for an item that has not been loaded.
    Placeholder,
}

impl<T> Slot<T> {
    /// Returns `true` if this slot holds a real item.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns `true` if this slot is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// Returns the loaded item, if any.
    pub fn loaded(self) -> Option<T> {
        match self {
            Self::Loaded(item) => Some(item),
            Self::Placeholder => None,
        }
    }

    /// Borrows the loaded item, if any.
    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(item) => Some(item),
            Self::Placeholder => None,
        }
    }

    /// Converts `&Slot<T>` into `Slot<&T>`.
    pub fn as_ref(&self) -> Slot<&T> {
        match self {
            Self::Loaded(item) => Slot::Loaded(item),
            Self::Placeholder => Slot::Placeholder,
        }
    }

    /// Maps the loaded item, leaving placeholders untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Self::Loaded(item) => Slot::Loaded(f(item)),
            Self::Placeholder => Slot::Placeholder,
        }
    }
}

impl<T: Clone> Slot<&T> {
    /// Clones the borrowed item into an owned slot.
    pub fn cloned(self) -> Slot<T> {
        self.map(T::clone)
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Placeholder, Self::Loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_never_equals_item() {
        assert_ne!(Slot::Loaded(""), Slot::Placeholder);
        assert_ne!(Slot::Loaded(0), Slot::Placeholder);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Slot::from(Some(3)), Slot::Loaded(3));
        assert_eq!(Slot::<i32>::from(None), Slot::Placeholder);
    }

    #[test]
    fn test_accessors() {
        let slot = Slot::Loaded(String::from("a"));
        assert!(slot.is_loaded());
        assert_eq!(slot.as_loaded().map(String::as_str), Some("a"));
        assert_eq!(slot.as_ref().cloned(), Slot::Loaded(String::from("a")));
        assert!(Slot::<u8>::Placeholder.is_placeholder());
        assert_eq!(Slot::<u8>::Placeholder.loaded(), None);
    }
}
