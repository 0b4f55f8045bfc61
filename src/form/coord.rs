use crate::form::numeric::{round_half_up, NumericParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    X,
    Y,
}

/// Parses a `<num>x<num>` pair such as `24x24`.
///
/// The first `x` switches from the first to the second component; each side
/// is a [`NumericParser`], so its leniency carries over.
#[derive(Debug, Clone)]
pub struct CoordParser {
    side: Side,
    x: NumericParser,
    y: NumericParser,
}

impl Default for CoordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordParser {
    pub fn new() -> Self {
        Self {
            side: Side::X,
            x: NumericParser::new(),
            y: NumericParser::new(),
        }
    }

    pub fn execute(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        if self.side == Side::X {
            match rest.iter().position(|&b| b == b'x') {
                Some(at) => {
                    self.x.execute(&rest[..at]);
                    self.side = Side::Y;
                    rest = &rest[at + 1..];
                }
                None => {
                    self.x.execute(rest);
                    return;
                }
            }
        }
        self.y.execute(rest);
    }

    pub fn x(&self) -> f64 {
        self.x.result()
    }

    pub fn y(&self) -> f64 {
        self.y.result()
    }

    /// Both components rounded to integers.
    pub fn rounded(&self) -> (i32, i32) {
        (round_half_up(self.x()), round_half_up(self.y()))
    }
}
