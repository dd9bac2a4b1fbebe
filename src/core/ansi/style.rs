//! SGR (Select Graphic Rendition) interpreter and the interned [`StyleRecord`] table.
//!
//! Styles are interned in a process-wide table keyed by their full field set, so that runs of
//! identical style coalesce downstream by `Arc` pointer equality rather than structural equality.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// An RGB color value. Only the fixed 16-color palette is representable through [`StyleEngine`];
/// true-color SGR sequences are silently ignored per spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    /// Render as an upper-case `#RRGGBB` string, matching the original's string-typed colors.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

pub const DEFAULT_FG: Rgb = Rgb::new(0x00, 0x00, 0x00);
pub const DEFAULT_BG: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

/// Opacity is quantized to a handful of representative bit patterns so that `StyleKey` can derive
/// `Eq`/`Hash` without a float wrapper; the only two values ever produced are `1.0` and `0.5`.
type OpacityBits = u32;

/// Immutable, structurally-equal style key. Two `StyleKey`s with the same fields always resolve to
/// the same interned [`StyleRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StyleKey {
    bold: bool,
    italic: bool,
    underline: bool,
    visible: bool,
    opacity_bits: OpacityBits,
    fg: Rgb,
    bg: Rgb,
}

/// An immutable, interned style. Equality for the purposes of run-coalescing is `Arc` pointer
/// equality (see [`StyleRecord::same_as`]), not structural equality, matching the spec's
/// "interning" invariant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleRecord {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub visible: bool,
    pub opacity: f32,
    pub fg: Rgb,
    pub bg: Rgb,
}

impl StyleRecord {
    pub const fn default_style() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            visible: true,
            opacity: 1.0,
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
        }
    }

    fn key(&self) -> StyleKey {
        StyleKey {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            visible: self.visible,
            opacity_bits: self.opacity.to_bits(),
            fg: self.fg,
            bg: self.bg,
        }
    }
}

/// Process-wide hash-consing table. A single table is shared by every [`StyleEngine`] instance
/// (one per session) so that identical styles from different sessions still compare equal by
/// handle -- mirroring the original's single module-level `STYLE_SET` class attribute.
static INTERN_TABLE: OnceLock<Mutex<HashMap<StyleKey, Arc<StyleRecord>>>> = OnceLock::new();

fn intern_table() -> &'static Mutex<HashMap<StyleKey, Arc<StyleRecord>>> {
    INTERN_TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn intern(record: StyleRecord) -> Arc<StyleRecord> {
    let key = record.key();
    let mut table = intern_table().lock().expect("style intern table poisoned");
    table.entry(key).or_insert_with(|| Arc::new(record)).clone()
}

/// Returns `true` iff both handles were produced by the same `intern()` call -- the handle-equality
/// check the spec requires for coalescing adjacent cells into a single rendered run.
pub fn same_style(a: &Arc<StyleRecord>, b: &Arc<StyleRecord>) -> bool { Arc::ptr_eq(a, b) }

/// Interned handle for the default style, used whenever a blank cell is synthesized outside the
/// current pen (e.g. padding a line, inserting blanks) rather than written through it.
pub fn default_handle() -> Arc<StyleRecord> { intern(StyleRecord::default_style()) }

fn palette_color(code: u16) -> Option<Rgb> {
    Some(match code {
        30 | 40 => Rgb::new(0x00, 0x00, 0x00),
        31 | 41 => Rgb::new(0x80, 0x00, 0x00),
        32 | 42 => Rgb::new(0x00, 0x80, 0x00),
        33 | 43 => Rgb::new(0x80, 0x80, 0x00),
        34 | 44 => Rgb::new(0x00, 0x00, 0x80),
        35 | 45 => Rgb::new(0x80, 0x00, 0x80),
        36 | 46 => Rgb::new(0x00, 0x80, 0x80),
        37 | 47 => Rgb::new(0xC0, 0xC0, 0xC0),
        90 | 100 => Rgb::new(0x80, 0x80, 0x80),
        91 | 101 => Rgb::new(0xFF, 0x00, 0x00),
        92 | 102 => Rgb::new(0x00, 0xFF, 0x00),
        93 | 103 => Rgb::new(0xFF, 0xFF, 0x00),
        94 | 104 => Rgb::new(0x00, 0x00, 0xFF),
        95 | 105 => Rgb::new(0xFF, 0x00, 0xFF),
        96 | 106 => Rgb::new(0x00, 0xFF, 0xFF),
        97 | 107 => Rgb::new(0xFF, 0xFF, 0xFF),
        _ => return None,
    })
}

/// Per-session SGR interpreter. Holds the pen's current style and folds `CSI ... m` parameter
/// lists into it, producing an interned [`StyleRecord`] on demand.
#[derive(Debug, Clone)]
pub struct StyleEngine {
    current: StyleRecord,
}

impl Default for StyleEngine {
    fn default() -> Self { Self::new() }
}

impl StyleEngine {
    pub fn new() -> Self { Self { current: StyleRecord::default_style() } }

    /// Current interned style handle.
    pub fn current(&self) -> Arc<StyleRecord> { intern(self.current) }

    /// Fold a semicolon-separated SGR parameter list into the current style. Unrecognized
    /// parameters (including `38;2;...`/`38;5;...` true-color and anything starting with `>`,
    /// e.g. mouse-shape resets smuggled in via `CSI > 4 m`) are silently ignored.
    pub fn update(&mut self, csi_params: &str) {
        if csi_params.contains('>') {
            return;
        }

        for param in csi_params.split(';') {
            self.apply_one(param);
        }
    }

    fn apply_one(&mut self, param: &str) {
        match param {
            "" | "0" | "00" => self.current = StyleRecord::default_style(),
            "1" | "01" => self.current.bold = true,
            "22" => self.current.bold = false,
            "2" | "02" => self.current.opacity = 0.5,
            "3" | "03" => self.current.italic = true,
            "4" | "04" => self.current.underline = true,
            "24" => self.current.underline = false,
            "7" | "07" => {
                self.current.fg = DEFAULT_BG;
                self.current.bg = DEFAULT_FG;
            }
            "27" => {
                self.current.fg = DEFAULT_FG;
                self.current.bg = DEFAULT_BG;
            }
            "8" | "08" => self.current.visible = false,
            "28" => self.current.visible = true,
            "39" => self.current.fg = DEFAULT_FG,
            "49" => self.current.bg = DEFAULT_BG,
            _ => {
                if let Ok(code) = param.parse::<u16>() {
                    self.apply_numeric(code);
                }
            }
        }
    }

    fn apply_numeric(&mut self, code: u16) {
        match code {
            30..=37 | 90..=97 => {
                if let Some(rgb) = palette_color(code) {
                    self.current.fg = rgb;
                }
            }
            40..=47 | 100..=107 => {
                if let Some(rgb) = palette_color(code) {
                    self.current.bg = rgb;
                }
            }
            _ => {
                tracing::trace!(sgr_param = code, "ignoring unrecognized SGR parameter");
            }
        }
    }
}
