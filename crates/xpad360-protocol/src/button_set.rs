use std::fmt;

use crate::types::Button;

/// Compact set of pressed buttons.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u16);

impl ButtonSet {
    /// Create a new set from a slice of buttons.
    pub const fn new(buttons: &[Button]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < buttons.len() {
            bits |= buttons[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Create an empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create a set from raw bits. Bits with no matching button are dropped.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::all_bits())
    }

    /// Raw bit representation.
    #[inline]
    pub const fn bits(&self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn contains(&self, button: Button) -> bool {
        (self.0 & button.bit()) != 0
    }

    #[inline]
    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    #[inline]
    pub fn remove(&mut self, button: Button) {
        self.0 &= !button.bit();
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check if every button in this set is also in `other`.
    #[inline]
    pub const fn is_subset(&self, other: &ButtonSet) -> bool {
        self.0 & other.0 == self.0
    }

    /// Number of buttons in the set.
    #[inline]
    pub const fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Buttons pressed in `self` but not in `previous`.
    #[inline]
    pub const fn pressed_since(&self, previous: &ButtonSet) -> ButtonSet {
        ButtonSet(self.0 & !previous.0)
    }

    /// Buttons in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.contains(*b))
    }

    const fn all_bits() -> u16 {
        let mut bits = 0;
        let mut i = 0;
        while i < Button::ALL.len() {
            bits |= Button::ALL[i].bit();
            i += 1;
        }
        bits
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        let mut set = ButtonSet::empty();
        for b in iter {
            set.insert(b);
        }
        set
    }
}

impl fmt::Debug for ButtonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for ButtonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for b in self.iter() {
            if !first {
                f.write_str("+")?;
            }
            first = false;
            write!(f, "{b}")?;
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ButtonSet;
    use crate::Button;

    #[test]
    fn empty_has_no_buttons() {
        let set = ButtonSet::empty();
        assert!(set.is_empty());
        for b in Button::ALL {
            assert!(!set.contains(b));
        }
    }

    #[test]
    fn new_handles_duplicates() {
        let set = ButtonSet::new(&[Button::B, Button::B, Button::Y]);
        assert_eq!(set.count(), 2);
        assert!(set.contains(Button::B));
        assert!(set.contains(Button::Y));
        assert!(!set.contains(Button::A));
    }

    #[test]
    fn insert_and_remove_toggle_buttons() {
        let mut set = ButtonSet::empty();
        set.insert(Button::A);
        set.insert(Button::Start);
        assert!(set.contains(Button::A));
        set.remove(Button::A);
        assert!(!set.contains(Button::A));
        assert!(set.contains(Button::Start));
    }

    #[test]
    fn subset_and_pressed_since() {
        let a = ButtonSet::new(&[Button::A]);
        let ab = ButtonSet::new(&[Button::A, Button::B]);
        assert!(a.is_subset(&ab));
        assert!(!ab.is_subset(&a));
        assert!(ButtonSet::empty().is_subset(&a));
        assert_eq!(ab.pressed_since(&a), ButtonSet::new(&[Button::B]));
    }

    #[test]
    fn from_bits_drops_unknown_bits() {
        let set = ButtonSet::from_bits(0xFFFF);
        assert_eq!(set.count(), 15);
    }

    #[test]
    fn display_joins_names() {
        let set = ButtonSet::new(&[Button::Y, Button::DPadUp]);
        assert_eq!(set.to_string(), "dpad_up+y");
        assert_eq!(ButtonSet::empty().to_string(), "-");
    }
}
