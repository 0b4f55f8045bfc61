/// Where the numeric parser is within the decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumericState {
    Start,
    Integer,
    Fraction,
}

/// Accumulates decimal text (`-12`, `3.75`, `+.5`) into a float.
///
/// Characters that are not part of a decimal number are ignored.
#[derive(Debug, Clone)]
pub struct NumericParser {
    state: NumericState,
    negative: bool,
    integer: f64,
    fraction: f64,
    scale: f64,
}

impl Default for NumericParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NumericParser {
    pub fn new() -> Self {
        Self {
            state: NumericState::Start,
            negative: false,
            integer: 0.0,
            fraction: 0.0,
            scale: 1.0,
        }
    }

    pub fn execute(&mut self, chunk: &[u8]) {
        for &b in chunk {
            match b {
                b'-' | b'+' if self.state == NumericState::Start => {
                    self.negative = b == b'-';
                    self.state = NumericState::Integer;
                }
                b'0'..=b'9' => {
                    let digit = f64::from(b - b'0');
                    if self.state == NumericState::Fraction {
                        self.scale *= 0.1;
                        self.fraction += digit * self.scale;
                    } else {
                        self.integer = self.integer * 10.0 + digit;
                        self.state = NumericState::Integer;
                    }
                }
                b'.' if self.state != NumericState::Fraction => {
                    self.state = NumericState::Fraction;
                }
                _ => {}
            }
        }
    }

    pub fn result(&self) -> f64 {
        let value = self.integer + self.fraction;
        if self.negative { -value } else { value }
    }

    /// Result rounded as `(int)(x + 0.5)`.
    pub fn rounded(&self) -> i32 {
        round_half_up(self.result())
    }
}

/// Rounds by adding one half and truncating toward zero.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5) as i32
}
