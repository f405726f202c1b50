use wifirf_globals::{Band, PerBand, Xtal};

/* Reset defaults of the trim fields */
pub const DEFAULT_PA_BIAS: u8 = 0x18;
pub const DEFAULT_PA_VCAS: u8 = 0x0c;
pub const DEFAULT_LDO_TRIM: u8 = 0x10;
pub const DEFAULT_BUCK_TRIM: u8 = 0x0e;
pub const DEFAULT_BB_SCALE: u8 = 0x40;

/// Board specific bring-up trims.
///
/// Applied once by [`Radio::init_system`](crate::Radio::init_system) and never
/// modified by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfPatch {
    pub xtal: Xtal,
    /// PA bias current trim, six bits.
    pub pa_bias: PerBand<u8>,
    /// PA cascode voltage trim, six bits.
    pub pa_vcas: PerBand<u8>,
    pub ldo_trim: u8,
    pub buck_trim: u8,
    /// Baseband scale applied while DPD is active.
    pub bb_scale: PerBand<u8>,
}

impl Default for RfPatch {
    fn default() -> Self {
        Self {
            xtal: Xtal::default(),
            pa_bias: PerBand::splat(DEFAULT_PA_BIAS),
            pa_vcas: PerBand::splat(DEFAULT_PA_VCAS),
            ldo_trim: DEFAULT_LDO_TRIM,
            buck_trim: DEFAULT_BUCK_TRIM,
            bb_scale: PerBand::splat(DEFAULT_BB_SCALE),
        }
    }
}

impl RfPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_xtal(mut self, xtal: Xtal) -> Self {
        self.xtal = xtal;
        self
    }

    pub fn with_pa_trim(mut self, band: Band, bias: u8, vcas: u8) -> Self {
        self.pa_bias[band] = bias;
        self.pa_vcas[band] = vcas;
        self
    }

    pub fn with_ldo_trim(mut self, trim: u8) -> Self {
        self.ldo_trim = trim;
        self
    }

    pub fn with_buck_trim(mut self, trim: u8) -> Self {
        self.buck_trim = trim;
        self
    }

    pub fn with_bb_scale(mut self, band: Band, scale: u8) -> Self {
        self.bb_scale[band] = scale;
        self
    }
}
