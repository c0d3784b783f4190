//! Hover-card theme selection.
//!
//! The card has no styling context of its own, so its theme is derived
//! from the page: collect the inline `background-color` of every
//! ancestor of the anchor, composite them outermost-first, and read the
//! result. A dark composite picks the dark theme, a light one the light
//! theme. The card's own background is the composite pushed away from
//! the midpoint so it stands out against the page.

use crate::dom::{Document, NodeId};

/// Midpoint of an 8-bit channel; the dark/light pivot.
const MIDDLE_LUMINOSITY: f64 = 128.0;

/// Card theme, named by the class the presentation layer attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn class(&self) -> &'static str {
        match self {
            Theme::Dark => "qtip-dark",
            Theme::Light => "qtip-light",
        }
    }
}

/// Theme plus the accent background derived from the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    pub theme: Theme,
    /// CSS `rgb(r, g, b)` value for the card background.
    pub background: String,
}

/// A parsed CSS color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba {
        r: 255.0,
        g: 255.0,
        b: 255.0,
        a: 1.0,
    };

    pub fn is_transparent(&self) -> bool {
        self.a == 0.0
    }

    /// Parse `rgb()`, `rgba()`, `#rgb`, `#rrggbb` and `transparent`.
    pub fn parse(value: &str) -> Option<Rgba> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("transparent") {
            return Some(Rgba {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 0.0,
            });
        }
        if let Some(hex) = value.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let inner = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let parts: Vec<f64> = inner
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [r, g, b] => Some(Rgba {
                r: *r,
                g: *g,
                b: *b,
                a: 1.0,
            }),
            [r, g, b, a] => Some(Rgba {
                r: *r,
                g: *g,
                b: *b,
                a: *a,
            }),
            _ => None,
        }
    }

    fn parse_hex(hex: &str) -> Option<Rgba> {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(f64::from);
        match hex.len() {
            3 => {
                let mut chars = hex.chars();
                let mut next = || {
                    let c = chars.next()?;
                    channel(&format!("{c}{c}"))
                };
                Some(Rgba {
                    r: next()?,
                    g: next()?,
                    b: next()?,
                    a: 1.0,
                })
            }
            6 => Some(Rgba {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
                a: 1.0,
            }),
            _ => None,
        }
    }
}

/// Inline `background-color` declarations of `node`'s ancestors,
/// nearest first, transparent entries dropped.
pub fn background_colors(doc: &Document, node: NodeId) -> Vec<Rgba> {
    doc.ancestors(node)
        .into_iter()
        .filter_map(|n| {
            let style = doc.element(n)?.attr("style")?;
            declared_background(style)
        })
        .filter(|c| !c.is_transparent())
        .collect()
}

fn declared_background(style: &str) -> Option<Rgba> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("background-color") {
            Rgba::parse(value)
        } else {
            None
        }
    })
}

/// Pick the card scheme for an anchor inside the document.
pub fn choose_scheme(doc: &Document, anchor: NodeId) -> Scheme {
    scheme_for(&background_colors(doc, anchor))
}

/// Scheme for an explicit stack of ancestor backgrounds, nearest first.
/// An empty stack reads as a plain white page.
pub fn scheme_for(colors: &[Rgba]) -> Scheme {
    let composed = compose(colors);
    let channels = [composed.r, composed.g, composed.b];
    let max = channels.iter().copied().fold(f64::MIN, f64::max);
    let min = channels.iter().copied().fold(f64::MAX, f64::min);
    let median_luminosity = (max + min) / 2.0;
    let theme = if median_luminosity < MIDDLE_LUMINOSITY {
        Theme::Dark
    } else {
        Theme::Light
    };
    let adjusted: Vec<String> = channels
        .iter()
        .map(|&c| adjust_channel(c).to_string())
        .collect();
    Scheme {
        theme,
        background: format!("rgb({})", adjusted.join(", ")),
    }
}

/// Alpha-composite the stack outermost-first over white.
fn compose(colors: &[Rgba]) -> Rgba {
    colors.iter().rev().fold(Rgba::WHITE, |acc, c| Rgba {
        r: acc.r * (1.0 - c.a) + c.r * c.a,
        g: acc.g * (1.0 - c.a) + c.g * c.a,
        b: acc.b * (1.0 - c.a) + c.b * c.a,
        a: 1.0,
    })
}

/// Push a channel away from the midpoint on a concave curve so
/// near-middle backgrounds still yield a visible contrast.
fn adjust_channel(channel: f64) -> i64 {
    let scale = (channel - MIDDLE_LUMINOSITY) / MIDDLE_LUMINOSITY;
    (scale.abs().powf(0.7) * scale.signum() * MIDDLE_LUMINOSITY + MIDDLE_LUMINOSITY).round()
        as i64
}
