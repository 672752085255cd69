//! Keyboard state.
//!
//! Wraps the xkbcommon state machine for the seat: key state updates,
//! modifier serialization, LED bookkeeping, layout index and numlock
//! control. Replacing the keymap (or rebuilding the state after a tty
//! switch) preserves the latched and locked modifiers and the layout.

use std::fs::File;

use thiserror::Error;
use tracing::{debug, info};
use xkbcommon::xkb;

use crate::backend::Leds;
use crate::event::Modifiers;

const LED_INVALID: xkb::LedIndex = u32::MAX;

/// Errors raised while setting up keyboard state.
#[derive(Debug, Error)]
pub enum Error {
    /// libxkbcommon could not load the specified keymap.
    #[error("libxkbcommon could not load the specified keymap")]
    BadKeymap,
}

/// Configuration for xkbcommon keymap compilation.
///
/// Empty fields defer to the `XKB_DEFAULT_*` environment variables. When
/// `file` is set, the keymap is compiled from that file instead of the RMLVO
/// names.
#[derive(Clone, Debug, Default)]
pub struct XkbConfig<'a> {
    /// The rules file to use.
    pub rules: &'a str,
    /// The keyboard model by which to interpret keycodes and LEDs.
    pub model: &'a str,
    /// Comma-separated list of layouts to include in the keymap.
    pub layout: &'a str,
    /// Comma-separated list of variants, one per layout.
    pub variant: &'a str,
    /// Comma-separated list of non-layout options.
    pub options: Option<String>,
    /// Path to a stand-alone keymap file used instead of a system keymap.
    pub file: Option<String>,
}

impl<'a> XkbConfig<'a> {
    pub(crate) fn compile_keymap(&self, context: &xkb::Context) -> Result<xkb::Keymap, ()> {
        match &self.file {
            Some(path) => {
                let mut file = File::open(path).map_err(|_| ())?;
                xkb::Keymap::new_from_file(
                    context,
                    &mut file,
                    xkb::KEYMAP_FORMAT_TEXT_V1,
                    xkb::KEYMAP_COMPILE_NO_FLAGS,
                )
                .ok_or(())
            }
            None => xkb::Keymap::new_from_names(
                context,
                self.rules,
                self.model,
                self.layout,
                self.variant,
                self.options.clone(),
                xkb::KEYMAP_COMPILE_NO_FLAGS,
            )
            .ok_or(()),
        }
    }
}

/// The seat's xkb keyboard state.
pub struct KeyboardState {
    context: xkb::Context,
    keymap: xkb::Keymap,
    state: xkb::State,
    caps_lock_led: xkb::LedIndex,
    num_lock_led: xkb::LedIndex,
    scroll_lock_led: xkb::LedIndex,
    layout_idx: xkb::LayoutIndex,
}

impl std::fmt::Debug for KeyboardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardState")
            .field("keymap", &self.keymap.get_raw_ptr())
            .field("state", &self.state.get_raw_ptr())
            .field("layout_idx", &self.layout_idx)
            .finish()
    }
}

impl KeyboardState {
    pub(crate) fn new(config: &XkbConfig<'_>) -> Result<KeyboardState, Error> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = config.compile_keymap(&context).map_err(|_| {
            debug!("loading keymap failed");
            Error::BadKeymap
        })?;
        let state = xkb::State::new(&keymap);

        let mut keyboard = KeyboardState {
            context,
            keymap,
            state,
            caps_lock_led: LED_INVALID,
            num_lock_led: LED_INVALID,
            scroll_lock_led: LED_INVALID,
            layout_idx: 0,
        };
        keyboard.refresh_led_indices();
        info!(layout = config.layout, "initialized xkb keyboard state");
        Ok(keyboard)
    }

    fn refresh_led_indices(&mut self) {
        self.caps_lock_led = self.keymap.led_get_index(xkb::LED_NAME_CAPS);
        self.num_lock_led = self.keymap.led_get_index(xkb::LED_NAME_NUM);
        self.scroll_lock_led = self.keymap.led_get_index(xkb::LED_NAME_SCROLL);
    }

    /// The keymap currently in use.
    pub fn keymap(&self) -> &xkb::Keymap {
        &self.keymap
    }

    /// The underlying xkb state.
    pub fn state(&self) -> &xkb::State {
        &self.state
    }

    /// Compile a keymap against this keyboard's context.
    pub(crate) fn compile(&self, config: &XkbConfig<'_>) -> Result<xkb::Keymap, Error> {
        config.compile_keymap(&self.context).map_err(|_| Error::BadKeymap)
    }

    /// Feed a key state change into xkb. Returns the changed state
    /// components.
    ///
    /// The keycode is an evdev code; xkb keycodes are offset by 8.
    pub(crate) fn update_key(&mut self, keycode: u32, pressed: bool) -> xkb::StateComponent {
        let direction = if pressed {
            xkb::KeyDirection::Down
        } else {
            xkb::KeyDirection::Up
        };
        self.state.update_key((keycode + 8).into(), direction)
    }

    /// Keysym produced by an evdev keycode under the current state.
    pub(crate) fn keysym(&self, keycode: u32) -> xkb::Keysym {
        self.state.key_get_one_sym((keycode + 8).into())
    }

    /// Whether a held key produces auto-repeat.
    pub(crate) fn key_repeats(&self, keycode: u32) -> bool {
        self.keymap.key_repeats((keycode + 8).into())
    }

    /// Current modifier mask, combined with the given pointer button bits.
    pub fn modifiers(&self, buttons: Modifiers) -> Modifiers {
        let mods = self.state.serialize_mods(xkb::STATE_MODS_EFFECTIVE);
        Modifiers::from_bits_truncate(mods) | buttons
    }

    /// Serialized (depressed, latched, locked) modifier masks.
    pub fn serialized_mods(&self) -> (u32, u32, u32) {
        (
            self.state.serialize_mods(xkb::STATE_MODS_DEPRESSED),
            self.state.serialize_mods(xkb::STATE_MODS_LATCHED),
            self.state.serialize_mods(xkb::STATE_MODS_LOCKED),
        )
    }

    /// Current LED state.
    pub fn led_state(&self) -> Leds {
        let mut leds = Leds::empty();
        if self.led_active(self.caps_lock_led) {
            leds |= Leds::CAPS_LOCK;
        }
        if self.led_active(self.num_lock_led) {
            leds |= Leds::NUM_LOCK;
        }
        if self.led_active(self.scroll_lock_led) {
            leds |= Leds::SCROLL_LOCK;
        }
        leds
    }

    fn led_active(&self, led: xkb::LedIndex) -> bool {
        led != LED_INVALID && self.state.led_index_is_active(led)
    }

    /// Replace the keymap, preserving latched and locked modifiers and the
    /// layout index across the new state.
    pub(crate) fn set_keymap(&mut self, keymap: xkb::Keymap) {
        self.keymap = keymap;
        self.rebuild_state();
    }

    /// Rebuild the state on the current keymap, used when reclaiming
    /// devices after a tty switch.
    pub(crate) fn rebuild_state(&mut self) {
        let latched = self.state.serialize_mods(xkb::STATE_MODS_LATCHED);
        let locked = self.state.serialize_mods(xkb::STATE_MODS_LOCKED);

        self.state = xkb::State::new(&self.keymap);
        self.state.update_mask(0, latched, locked, 0, 0, self.layout_idx);
        self.refresh_led_indices();
    }

    /// Switch the active layout, preserving all serialized modifiers.
    pub(crate) fn set_layout_index(&mut self, idx: xkb::LayoutIndex) {
        let depressed = self.state.serialize_mods(xkb::STATE_MODS_DEPRESSED);
        let latched = self.state.serialize_mods(xkb::STATE_MODS_LATCHED);
        let locked = self.state.serialize_mods(xkb::STATE_MODS_LOCKED);

        self.state.update_mask(depressed, latched, locked, 0, 0, idx);
        self.layout_idx = idx;
    }

    /// The active layout index.
    pub(crate) fn layout_index(&self) -> xkb::LayoutIndex {
        self.layout_idx
    }

    /// Set or clear numlock in the locked modifiers.
    ///
    /// The numlock bit is whatever the keymap binds to `Mod2`; the effective
    /// layout is preserved through the mask update.
    pub(crate) fn set_numlock(&mut self, enabled: bool) {
        let index = self.keymap.mod_get_index(xkb::MOD_NAME_NUM);
        if index >= 32 {
            debug!("keymap has no numlock modifier");
            return;
        }
        let numlock = 1u32 << index;

        let depressed = self.state.serialize_mods(xkb::STATE_MODS_DEPRESSED);
        let latched = self.state.serialize_mods(xkb::STATE_MODS_LATCHED);
        let mut locked = self.state.serialize_mods(xkb::STATE_MODS_LOCKED);
        let group = self.state.serialize_layout(xkb::STATE_LAYOUT_EFFECTIVE);

        if enabled {
            locked |= numlock;
        } else {
            locked &= !numlock;
        }

        self.state.update_mask(depressed, latched, locked, 0, 0, group);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal self-contained keymap so tests do not depend on the host's
    /// xkb data files.
    pub(crate) const TEST_KEYMAP: &str = r#"
xkb_keymap {
    xkb_keycodes "test" {
        minimum = 8;
        maximum = 255;
        <AC01> = 38;
        <LFSH> = 50;
        <CAPS> = 66;
        <NMLK> = 77;
        indicator 1 = "Caps Lock";
        indicator 2 = "Num Lock";
        indicator 3 = "Scroll Lock";
    };
    xkb_types "test" {
        virtual_modifiers NumLock;
        type "ONE_LEVEL" {
            modifiers = none;
            map[none] = Level1;
            level_name[Level1] = "Any";
        };
        type "ALPHABETIC" {
            modifiers = Shift + Lock;
            map[Shift] = Level2;
            map[Lock] = Level2;
            level_name[Level1] = "Base";
            level_name[Level2] = "Caps";
        };
    };
    xkb_compatibility "test" {
        interpret Shift_L { action = SetMods(modifiers = Shift); };
        interpret Caps_Lock { action = LockMods(modifiers = Lock); };
        interpret Num_Lock { action = LockMods(modifiers = NumLock); };
        indicator "Caps Lock" { modifiers = Lock; };
        indicator "Num Lock" { modifiers = NumLock; };
    };
    xkb_symbols "test" {
        name[group1] = "Test";
        key <AC01> { type = "ALPHABETIC", repeat = Yes, [ a, A ] };
        key <LFSH> { type = "ONE_LEVEL", repeat = No, [ Shift_L ] };
        key <CAPS> { type = "ONE_LEVEL", repeat = No, [ Caps_Lock ] };
        key <NMLK> { type = "ONE_LEVEL", repeat = No, [ Num_Lock ] };
        modifier_map Shift { <LFSH> };
        modifier_map Lock { <CAPS> };
        modifier_map Mod2 { <NMLK> };
    };
};
"#;

    pub(crate) fn test_keymap(context: &xkb::Context) -> xkb::Keymap {
        xkb::Keymap::new_from_string(
            context,
            TEST_KEYMAP.to_string(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .expect("test keymap must compile")
    }

    pub(crate) fn test_keyboard() -> KeyboardState {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = test_keymap(&context);
        let state = xkb::State::new(&keymap);
        let mut keyboard = KeyboardState {
            context,
            keymap,
            state,
            caps_lock_led: LED_INVALID,
            num_lock_led: LED_INVALID,
            scroll_lock_led: LED_INVALID,
            layout_idx: 0,
        };
        keyboard.refresh_led_indices();
        keyboard
    }

    // evdev keycodes matching the keymap above
    pub(crate) const KEY_A: u32 = 30;
    pub(crate) const KEY_LEFTSHIFT: u32 = 42;
    pub(crate) const KEY_CAPSLOCK: u32 = 58;
    pub(crate) const KEY_NUMLOCK: u32 = 69;

    #[test]
    fn shift_shows_up_in_modifiers() {
        let mut keyboard = test_keyboard();
        assert_eq!(keyboard.modifiers(Modifiers::empty()), Modifiers::empty());

        keyboard.update_key(KEY_LEFTSHIFT, true);
        assert!(keyboard.modifiers(Modifiers::empty()).contains(Modifiers::SHIFT));

        keyboard.update_key(KEY_LEFTSHIFT, false);
        assert_eq!(keyboard.modifiers(Modifiers::empty()), Modifiers::empty());
    }

    #[test]
    fn caps_lock_toggles_led() {
        let mut keyboard = test_keyboard();
        assert_eq!(keyboard.led_state(), Leds::empty());

        let changed = keyboard.update_key(KEY_CAPSLOCK, true);
        keyboard.update_key(KEY_CAPSLOCK, false);
        assert!(changed != 0);
        assert_eq!(keyboard.led_state(), Leds::CAPS_LOCK);

        keyboard.update_key(KEY_CAPSLOCK, true);
        keyboard.update_key(KEY_CAPSLOCK, false);
        assert_eq!(keyboard.led_state(), Leds::empty());
    }

    #[test]
    fn numlock_set_and_clear_restores_locked_mods() {
        let mut keyboard = test_keyboard();
        let (_, _, locked_before) = keyboard.serialized_mods();

        keyboard.set_numlock(true);
        let (_, _, locked_on) = keyboard.serialized_mods();
        assert_ne!(locked_on, locked_before);
        assert!(keyboard.led_state().contains(Leds::NUM_LOCK));
        assert!(keyboard.modifiers(Modifiers::empty()).contains(Modifiers::MOD2));

        keyboard.set_numlock(false);
        let (_, _, locked_after) = keyboard.serialized_mods();
        assert_eq!(locked_after, locked_before);
        assert!(!keyboard.led_state().contains(Leds::NUM_LOCK));
    }

    #[test]
    fn rebuild_preserves_latched_and_locked_mods() {
        let mut keyboard = test_keyboard();
        keyboard.update_key(KEY_CAPSLOCK, true);
        keyboard.update_key(KEY_CAPSLOCK, false);
        keyboard.set_numlock(true);
        let (_, latched, locked) = keyboard.serialized_mods();

        keyboard.rebuild_state();
        let (depressed_after, latched_after, locked_after) = keyboard.serialized_mods();
        assert_eq!(depressed_after, 0);
        assert_eq!(latched_after, latched);
        assert_eq!(locked_after, locked);
        assert!(keyboard.led_state().contains(Leds::CAPS_LOCK));
    }

    #[test]
    fn keysym_follows_modifier_state() {
        let mut keyboard = test_keyboard();
        assert_eq!(keyboard.keysym(KEY_A), xkb::keysyms::KEY_a.into());
        keyboard.update_key(KEY_LEFTSHIFT, true);
        assert_eq!(keyboard.keysym(KEY_A), xkb::keysyms::KEY_A.into());
    }

    #[test]
    fn modifier_keys_do_not_repeat() {
        let keyboard = test_keyboard();
        assert!(keyboard.key_repeats(KEY_A));
        assert!(!keyboard.key_repeats(KEY_LEFTSHIFT));
        assert!(!keyboard.key_repeats(KEY_CAPSLOCK));
        assert!(!keyboard.key_repeats(KEY_NUMLOCK));
    }

    #[test]
    fn layout_round_trip() {
        let mut keyboard = test_keyboard();
        keyboard.set_numlock(true);
        let (_, latched, locked) = keyboard.serialized_mods();

        keyboard.set_layout_index(0);
        assert_eq!(keyboard.layout_index(), 0);
        let (_, latched_after, locked_after) = keyboard.serialized_mods();
        assert_eq!((latched_after, locked_after), (latched, locked));
    }
}
