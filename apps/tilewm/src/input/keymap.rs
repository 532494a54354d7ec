use xkbcommon::xkb::{self, keysyms};

pub const NO_SYMBOL: u32 = keysyms::KEY_NoSymbol;

/// Resolves a key name as written in a chord (`Return`, `j`, `F5`,
/// `XF86AudioMute`) through the xkbcommon keysym table.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    let lookup = match (chars.next(), chars.next()) {
        // Bindings match the unshifted column, so letters resolve lowercase.
        (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_lowercase().to_string(),
        _ => name.to_owned(),
    };

    let sym = match xkb::keysym_from_name(&lookup, xkb::KEYSYM_NO_FLAGS) {
        keysyms::KEY_NoSymbol => xkb::keysym_from_name(&lookup, xkb::KEYSYM_CASE_INSENSITIVE),
        sym => sym,
    };
    (sym != NO_SYMBOL).then_some(sym)
}

/// Keycode to keysym table as reported by `GetKeyboardMapping`.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    min_keycode: u8,
    keysyms_per_keycode: u8,
    keysyms: Vec<u32>,
}

impl Keymap {
    pub fn new(min_keycode: u8, keysyms_per_keycode: u8, keysyms: Vec<u32>) -> Self {
        Self { min_keycode, keysyms_per_keycode, keysyms }
    }

    /// Unshifted keysym of `keycode`, or `NO_SYMBOL`.
    pub fn keysym(&self, keycode: u8) -> u32 {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return NO_SYMBOL;
        }
        let index = usize::from(keycode - self.min_keycode) * usize::from(self.keysyms_per_keycode);
        self.keysyms.get(index).copied().unwrap_or(NO_SYMBOL)
    }

    /// Every keycode whose unshifted keysym is `sym`.
    pub fn keycodes(&self, sym: u32) -> Vec<u8> {
        if self.keysyms_per_keycode == 0 || sym == NO_SYMBOL {
            return Vec::new();
        }
        self.keysyms
            .chunks(usize::from(self.keysyms_per_keycode))
            .enumerate()
            .filter(|(_, syms)| syms.first() == Some(&sym))
            .filter_map(|(i, _)| u8::try_from(usize::from(self.min_keycode) + i).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(keysym_from_name("Return"), Some(0xff0d));
        assert_eq!(keysym_from_name("j"), Some(0x6a));
        assert_eq!(keysym_from_name("J"), Some(0x6a));
        assert_eq!(keysym_from_name("1"), Some(0x31));
        assert_eq!(keysym_from_name("F1"), Some(0xffbe));
        assert_eq!(keysym_from_name("F12"), Some(0xffc9));
        assert_eq!(keysym_from_name("space"), Some(0x20));
        assert_eq!(keysym_from_name("F0"), None);
        assert_eq!(keysym_from_name("NoSuchKey"), None);
        assert_eq!(keysym_from_name(""), None);
    }

    #[test]
    fn test_names_outside_the_common_set_resolve() {
        assert_eq!(keysym_from_name("Hyper_L"), Some(keysyms::KEY_Hyper_L));
        assert_eq!(keysym_from_name("XF86MonBrightnessUp"), Some(keysyms::KEY_XF86MonBrightnessUp));
        assert_eq!(keysym_from_name("KP_Enter"), Some(keysyms::KEY_KP_Enter));
        assert_eq!(keysym_from_name("return"), Some(keysyms::KEY_Return));
    }

    #[test]
    fn test_keymap_lookup_both_ways() {
        // Keycodes 8..=10, two keysyms each.
        let keymap = Keymap::new(8, 2, vec![0x61, 0x41, 0xff0d, 0, 0x61, 0x41]);
        assert_eq!(keymap.keysym(8), 0x61);
        assert_eq!(keymap.keysym(9), 0xff0d);
        assert_eq!(keymap.keysym(7), NO_SYMBOL);
        assert_eq!(keymap.keysym(200), NO_SYMBOL);
        assert_eq!(keymap.keycodes(0x61), vec![8, 10]);
        assert!(keymap.keycodes(0x41).is_empty());
        assert!(Keymap::default().keycodes(0x61).is_empty());
    }
}
