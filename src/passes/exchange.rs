//! Обмен массой между нижним и верхним слоями
//!
//! Положительный подъём (`uplift > 0`) переносит нижний воздух наверх,
//! отрицательный опускает верхний вниз. Веса каждого выхода в сумме дают 1
//! при `uplift ∈ [-1, 1]`.

use crate::field::{MAX_CHANNELS, Texel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeWeights {
    pub keep_low: f32,
    pub from_high: f32,
    pub keep_high: f32,
    pub from_low: f32,
}

impl ExchangeWeights {
    #[must_use]
    pub fn new(uplift: f32) -> Self {
        Self {
            keep_low: (1.0 + uplift).clamp(0.0, 1.0),
            from_high: (-uplift).clamp(0.0, 1.0),
            keep_high: (1.0 - uplift).clamp(0.0, 1.0),
            from_low: uplift.clamp(0.0, 1.0),
        }
    }

    /// Новое значение нижнего слоя
    #[must_use]
    pub fn low(&self, low: Texel, high: Texel) -> Texel {
        mix(low, self.keep_low, high, self.from_high)
    }

    /// Новое значение верхнего слоя
    #[must_use]
    pub fn high(&self, low: Texel, high: Texel) -> Texel {
        mix(high, self.keep_high, low, self.from_low)
    }
}

fn mix(a: Texel, wa: f32, b: Texel, wb: f32) -> Texel {
    let mut out = [0.0; MAX_CHANNELS];
    for k in 0..MAX_CHANNELS {
        out[k] = a[k] * wa + b[k] * wb;
    }
    out
}
