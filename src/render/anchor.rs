/// Anchor flags for text and icon placement.
use std::fmt;
use std::ops::BitOr;

/// Set of alignment flags, evaluated independently per axis.
///
/// On the horizontal axis LEFT wins over RIGHT, and either wins over
/// centering; the vertical axis does the same with TOP and BOTTOM. An empty
/// set, or one holding only `CENTER_X`/`CENTER_Y`, centres on that axis.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Anchor(u8);

impl Anchor {
    pub const LEFT: Anchor = Anchor(1 << 0);
    pub const RIGHT: Anchor = Anchor(1 << 1);
    pub const TOP: Anchor = Anchor(1 << 2);
    pub const BOTTOM: Anchor = Anchor(1 << 3);
    pub const CENTER_X: Anchor = Anchor(1 << 4);
    pub const CENTER_Y: Anchor = Anchor(1 << 5);

    pub const fn contains(self, other: Anchor) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn horizontal(self) -> Align {
        if self.contains(Self::LEFT) {
            Align::Start
        } else if self.contains(Self::RIGHT) {
            Align::End
        } else {
            Align::Center
        }
    }

    pub fn vertical(self) -> Align {
        if self.contains(Self::TOP) {
            Align::Start
        } else if self.contains(Self::BOTTOM) {
            Align::End
        } else {
            Align::Center
        }
    }
}

impl BitOr for Anchor {
    type Output = Anchor;

    fn bitor(self, rhs: Anchor) -> Anchor {
        Anchor(self.0 | rhs.0)
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Anchor, &str); 6] = [
            (Anchor::LEFT, "LEFT"),
            (Anchor::RIGHT, "RIGHT"),
            (Anchor::TOP, "TOP"),
            (Anchor::BOTTOM, "BOTTOM"),
            (Anchor::CENTER_X, "CENTER_X"),
            (Anchor::CENTER_Y, "CENTER_Y"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "Anchor(empty)")
        } else {
            write!(f, "Anchor({})", names.join(" | "))
        }
    }
}

/// Resolved placement along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    End,
    Center,
}

impl Align {
    /// Origin of a span of `length` cells inside `extent`, `padding` away
    /// from the anchored edge.
    pub fn origin(self, extent: u32, length: i32, padding: i32) -> i32 {
        match self {
            Align::Start => padding,
            Align::End => extent as i32 - length - padding,
            Align::Center => ((extent as i32 - length) as f64 / 2.0).ceil() as i32,
        }
    }
}
