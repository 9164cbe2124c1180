//! Window manager configuration.
//!
//! [`Config`] is the full set of static tables the user supplies at
//! startup: appearance, tags, rules, layouts and bindings. During
//! initialization the binding tables are moved out, and the rest
//! becomes a [`WmConfig`], consulted at runtime through the
//! [`RuntimeConfig`] trait so user code can substitute its own type.

use crate::bindings::{kb, mb, Action, ButtonIndex, Keybinds, ModKey, Mousebinds};
use crate::core::types::{Color, MonitorDir};
use crate::layouts::{default_layouts, Layout};
use crate::x::input::keysym::*;
use crate::WmError;

/// A window rule, consulted when a client is first managed.
///
/// All set match fields must hit (substring match, like the reference
/// implementations) for the rule to apply.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    /// Substring to match against the WM_CLASS class field.
    pub class: Option<String>,
    /// Substring to match against the WM_CLASS instance field.
    pub instance: Option<String>,
    /// Substring to match against the window title.
    pub title: Option<String>,
    /// Tags to place the client on. Zero means the monitor's current
    /// tag-set.
    pub tags: u32,
    /// Whether the client starts floating.
    pub is_floating: bool,
    /// Monitor to place the client on. Negative means the selected
    /// monitor.
    pub monitor: i32,
    /// Whether the client's size hints are honored while tiled.
    pub obeys_size_hints: bool,
}

impl Rule {
    /// Tests the rule against a client's class, instance and title.
    pub fn matches(&self, class: &str, instance: &str, title: &str) -> bool {
        self.class.as_ref().map_or(true, |c| class.contains(c.as_str()))
            && self
                .instance
                .as_ref()
                .map_or(true, |i| instance.contains(i.as_str()))
            && self.title.as_ref().map_or(true, |t| title.contains(t.as_str()))
    }
}

/// The color pairs and accents handed to the bar renderer.
///
/// Each pair is `(foreground, background)`.
#[derive(Debug, Clone, Copy)]
pub struct ColorScheme {
    pub norm: (Color, Color),
    pub sel: (Color, Color),
    pub urgent: (Color, Color),
    pub info_norm: (Color, Color),
    pub info_sel: (Color, Color),
    pub bar_text: (Color, Color),
    pub line: Color,
    pub bar_empty: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        ColorScheme {
            norm: (0xbbbbbb, 0x222222),
            sel: (0xeeeeee, 0x005577),
            urgent: (0x000000, 0xaa0000),
            info_norm: (0xbbbbbb, 0x222222),
            info_sel: (0xeeeeee, 0x005577),
            bar_text: (0xcccccc, 0x000000),
            line: 0x000000,
            bar_empty: 0x000000,
        }
    }
}

/// The static configuration consumed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    //* appearance
    pub font: String,
    pub colors: ColorScheme,
    pub border_px: u32,
    pub gap_px: i32,
    /// Distance in pixels at which mouse-driven moves snap to the work
    /// area edges.
    pub snap: i32,
    pub bar_height: i32,
    pub show_bar: bool,
    pub top_bar: bool,
    /// Whether to put pointer barriers around each work area.
    pub barriers: bool,

    //* tagging
    /// Ordered tag names; at most 31.
    pub tags: Vec<String>,
    /// Tag-set selected on a new monitor.
    pub startup_tags: u32,
    /// Per-monitor startup tag-sets used when more than one monitor is
    /// present; falls back to `startup_tags` past its end.
    pub startup_tags_multi: Vec<u32>,
    /// Tags never shown in the bar's tag list.
    pub hidden_tags: u32,

    //* layout
    pub mfact: f32,
    pub nmaster: u32,
    pub nmaster_dynamic_max: u32,
    /// Whether tiled clients honor their size hints unless a rule says
    /// otherwise.
    pub obeys_size_hints: bool,
    pub layouts: Vec<Layout>,

    pub rules: Vec<Rule>,
    pub keybinds: Keybinds,
    pub mousebinds: Mousebinds,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            font: "-*-terminus-medium-r-*-*-16-*-*-*-*-*-*-*".into(),
            colors: ColorScheme::default(),
            border_px: 5,
            gap_px: 5,
            snap: 32,
            bar_height: 19,
            show_bar: true,
            top_bar: true,
            barriers: false,
            tags: (1..=9).map(|i| i.to_string()).collect(),
            startup_tags: 1,
            startup_tags_multi: vec![1, 2, 1 << 4, 1 << 5],
            hidden_tags: 0,
            mfact: 0.55,
            nmaster: 0,
            nmaster_dynamic_max: 4,
            obeys_size_hints: true,
            layouts: default_layouts(),
            rules: vec![Rule {
                class: Some("Gimp".into()),
                is_floating: true,
                monitor: -1,
                ..Default::default()
            }],
            keybinds: default_keybinds(),
            mousebinds: default_mousebinds(),
        }
    }
}

impl Config {
    /// Checks the configuration invariants.
    pub fn validate(&self) -> Result<(), WmError> {
        let invalid = |msg: &str| Err(WmError::InvalidConfig(msg.into()));

        if self.tags.is_empty() || self.tags.len() > 31 {
            return invalid("between 1 and 31 tags required");
        }
        if !(0.05..=0.95).contains(&self.mfact) {
            return invalid("mfact must lie within [0.05, 0.95]");
        }
        if self.layouts.is_empty() {
            return invalid("at least one layout required");
        }
        if self.nmaster_dynamic_max == 0 {
            return invalid("nmaster_dynamic_max must be at least 1");
        }
        let tagmask = (1u32 << self.tags.len()) - 1;
        if self.startup_tags & tagmask == 0 {
            return invalid("startup_tags must select at least one existing tag");
        }
        Ok(())
    }

    /// Splits the configuration into its runtime part and the binding
    /// tables.
    pub fn split(self) -> (WmConfig, Keybinds, Mousebinds) {
        let Config {
            font,
            colors,
            border_px,
            gap_px,
            snap,
            bar_height,
            show_bar,
            top_bar,
            barriers,
            tags,
            startup_tags,
            startup_tags_multi,
            hidden_tags,
            mfact,
            nmaster,
            nmaster_dynamic_max,
            obeys_size_hints,
            layouts,
            rules,
            keybinds,
            mousebinds,
        } = self;

        (
            WmConfig {
                font,
                colors,
                border_px,
                gap_px,
                snap,
                bar_height,
                show_bar,
                top_bar,
                barriers,
                tags,
                startup_tags,
                startup_tags_multi,
                hidden_tags,
                mfact,
                nmaster,
                nmaster_dynamic_max,
                obeys_size_hints,
                layouts,
                rules,
            },
            keybinds,
            mousebinds,
        )
    }

    /// Converts into the runtime configuration, dropping the bindings.
    pub fn into_runtime(self) -> WmConfig {
        self.split().0
    }
}

/// The stock key bindings, mirroring the reference configuration.
/// Mod1 (Alt) is the base modifier.
pub fn default_keybinds() -> Keybinds {
    use crate::core::types::Direction::*;
    use Action::*;
    use ModKey::*;

    let mut binds = Keybinds::new();

    let term = vec!["uxterm".to_string()];
    let menu = vec!["dmenu_run".to_string()];

    binds.insert(kb(vec![Alt], XK_p), Spawn(menu));
    binds.insert(kb(vec![Alt, Shift], XK_Return), Spawn(term));
    binds.insert(kb(vec![Alt], XK_b), ToggleBar);
    binds.insert(kb(vec![Alt], XK_j), FocusStack(Forward));
    binds.insert(kb(vec![Alt], XK_k), FocusStack(Backward));
    binds.insert(kb(vec![Alt, Shift], XK_j), MoveStack(Forward));
    binds.insert(kb(vec![Alt, Shift], XK_k), MoveStack(Backward));
    binds.insert(kb(vec![Alt], XK_i), IncNMaster(1));
    binds.insert(kb(vec![Alt], XK_d), IncNMaster(-1));
    binds.insert(kb(vec![Alt], XK_h), SetMfact(-0.05));
    binds.insert(kb(vec![Alt], XK_l), SetMfact(0.05));
    binds.insert(kb(vec![Alt], XK_Tab), View(0));
    binds.insert(kb(vec![Alt], XK_grave), SwapFocus);
    binds.insert(kb(vec![Alt, Shift], XK_c), KillClient);
    binds.insert(kb(vec![Alt], XK_t), SetLayout(0));
    binds.insert(kb(vec![Alt], XK_f), SetLayout(1));
    binds.insert(kb(vec![Alt], XK_m), SetLayout(2));
    binds.insert(kb(vec![Alt, Shift], XK_space), ToggleFloating);
    binds.insert(kb(vec![Alt, Shift], XK_f), ToggleFullscreen);
    binds.insert(kb(vec![Alt], XK_minus), IncGap(-1));
    binds.insert(kb(vec![Alt], XK_equal), IncGap(1));
    binds.insert(kb(vec![Alt], XK_0), View(!0));
    binds.insert(kb(vec![Alt, Shift], XK_0), Tag(!0));
    binds.insert(kb(vec![Alt], XK_comma), FocusMonitorWarp(MonitorDir::Left));
    binds.insert(kb(vec![Alt], XK_period), FocusMonitorWarp(MonitorDir::Right));
    binds.insert(kb(vec![Alt, Ctrl], XK_comma), FocusMonitor(MonitorDir::Left));
    binds.insert(kb(vec![Alt, Ctrl], XK_period), FocusMonitor(MonitorDir::Right));
    binds.insert(kb(vec![Alt, Shift], XK_comma), TagMonitor(MonitorDir::Left));
    binds.insert(kb(vec![Alt, Shift], XK_period), TagMonitor(MonitorDir::Right));
    binds.insert(kb(vec![Alt, Shift], XK_q), Quit);

    for i in 0..9u32 {
        let key = XK_1 + i;
        binds.insert(kb(vec![Alt], key), View(1 << i));
        binds.insert(kb(vec![Alt, Ctrl], key), ToggleView(1 << i));
        binds.insert(kb(vec![Alt, Shift], key), Tag(1 << i));
        binds.insert(kb(vec![Alt, Ctrl, Shift], key), ToggleTag(1 << i));
    }

    binds
}

/// The stock mouse bindings: move, toggle-float and resize on the base
/// modifier plus the three buttons.
pub fn default_mousebinds() -> Mousebinds {
    use Action::*;
    use ModKey::*;

    let mut binds = Mousebinds::new();

    binds.insert(mb(vec![Alt], ButtonIndex::Left), MoveMouse);
    binds.insert(mb(vec![Alt], ButtonIndex::Middle), ToggleFloating);
    binds.insert(mb(vec![Alt], ButtonIndex::Right), ResizeMouse);

    binds
}

/// An object that can provide configuration values at runtime.
///
/// The manager is generic over this trait, so embedders can back it
/// with their own storage.
pub trait RuntimeConfig {
    /// The bar font name, for the bar renderer.
    fn font(&self) -> &str;
    /// The bar color scheme.
    fn colors(&self) -> &ColorScheme;
    /// The window border thickness.
    fn border_px(&self) -> u32;
    /// The initial gap around tiled windows.
    fn gap_px(&self) -> i32;
    /// The edge-snapping distance for mouse moves.
    fn snap(&self) -> i32;
    /// The height of the bar window.
    fn bar_height(&self) -> i32;
    /// Whether new monitors show a bar.
    fn show_bar(&self) -> bool;
    /// Whether the bar sits at the top of the monitor.
    fn top_bar(&self) -> bool;
    /// Whether to erect pointer barriers around work areas.
    fn barriers(&self) -> bool;
    /// The ordered tag names.
    fn tags(&self) -> &[String];
    /// Tags never shown in the tag list.
    fn hidden_tags(&self) -> u32;
    /// The tag-set a monitor starts with.
    ///
    /// `multi` selects the multi-monitor override table.
    fn startup_tags(&self, mon_num: usize, multi: bool) -> u32;
    /// The default master area factor.
    fn mfact(&self) -> f32;
    /// The default master count; zero selects the dynamic count.
    fn nmaster(&self) -> u32;
    /// The upper bound on the dynamic master count.
    fn nmaster_dynamic_max(&self) -> u32;
    /// Whether tiled clients honor size hints by default.
    fn obeys_size_hints(&self) -> bool;
    /// The layout table.
    fn layouts(&self) -> &[Layout];
    /// The window rules.
    fn rules(&self) -> &[Rule];

    /// The mask covering every configured tag.
    fn tag_mask(&self) -> u32 {
        (1u32 << self.tags().len()) - 1
    }

    /// The border color of the focused client.
    fn border_focused(&self) -> Color {
        self.colors().sel.1
    }

    /// The border color of unfocused clients.
    fn border_unfocused(&self) -> Color {
        self.colors().norm.1
    }

    /// The border color of urgent clients.
    fn border_urgent(&self) -> Color {
        self.colors().urgent.1
    }
}

/// The runtime configuration of the window manager, built from a
/// [`Config`] during initialization.
#[derive(Debug, Clone)]
pub struct WmConfig {
    font: String,
    colors: ColorScheme,
    border_px: u32,
    gap_px: i32,
    snap: i32,
    bar_height: i32,
    show_bar: bool,
    top_bar: bool,
    barriers: bool,
    tags: Vec<String>,
    startup_tags: u32,
    startup_tags_multi: Vec<u32>,
    hidden_tags: u32,
    mfact: f32,
    nmaster: u32,
    nmaster_dynamic_max: u32,
    obeys_size_hints: bool,
    layouts: Vec<Layout>,
    rules: Vec<Rule>,
}

impl RuntimeConfig for WmConfig {
    fn font(&self) -> &str {
        &self.font
    }

    fn colors(&self) -> &ColorScheme {
        &self.colors
    }

    fn border_px(&self) -> u32 {
        self.border_px
    }

    fn gap_px(&self) -> i32 {
        self.gap_px
    }

    fn snap(&self) -> i32 {
        self.snap
    }

    fn bar_height(&self) -> i32 {
        self.bar_height
    }

    fn show_bar(&self) -> bool {
        self.show_bar
    }

    fn top_bar(&self) -> bool {
        self.top_bar
    }

    fn barriers(&self) -> bool {
        self.barriers
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn hidden_tags(&self) -> u32 {
        self.hidden_tags
    }

    fn startup_tags(&self, mon_num: usize, multi: bool) -> u32 {
        if multi {
            self.startup_tags_multi
                .get(mon_num)
                .copied()
                .unwrap_or(self.startup_tags)
        } else {
            self.startup_tags
        }
    }

    fn mfact(&self) -> f32 {
        self.mfact
    }

    fn nmaster(&self) -> u32 {
        self.nmaster
    }

    fn nmaster_dynamic_max(&self) -> u32 {
        self.nmaster_dynamic_max
    }

    fn obeys_size_hints(&self) -> bool {
        self.obeys_size_hints
    }

    fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn bad_mfact_is_rejected() {
        let mut config = Config::default();
        config.mfact = 0.96;

        assert!(config.validate().is_err());
    }

    #[test]
    fn too_many_tags_are_rejected() {
        let mut config = Config::default();
        config.tags = (0..32).map(|i| i.to_string()).collect();

        assert!(config.validate().is_err());
    }

    #[test]
    fn rule_matching_is_substring_based() {
        let rule = Rule {
            class: Some("Gimp".into()),
            title: Some("scratch".into()),
            ..Default::default()
        };

        assert!(rule.matches("Gimp-2.10", "gimp", "my scratchpad"));
        assert!(!rule.matches("Gimp-2.10", "gimp", "canvas"));
        assert!(!rule.matches("Firefox", "navigator", "scratch"));
    }

    #[test]
    fn startup_tags_multi_falls_back_past_the_table() {
        let config = Config::default().into_runtime();

        assert_eq!(config.startup_tags(1, true), 2);
        assert_eq!(config.startup_tags(9, true), config.startup_tags(0, false));
        assert_eq!(config.startup_tags(1, false), 1);
    }
}
