//! Core units, constants, and shared primitives for the railbrake workspace.
//!
//! Brake pressures are carried internally in pounds per square inch. Vacuum
//! systems use absolute pressure (psia), air systems use gauge pressure (psig).

/// Physical constants expressed in the internal unit set.
pub mod constants {
    /// Standard atmosphere in psia.
    pub const ONE_ATMOSPHERE_PSI: f64 = 14.695_949;
    /// Cubic metres per cubic foot.
    pub const M3_PER_FT3: f64 = 0.028_316_846_592;
    /// Brake system volume of the reference train used to scale time constants (200 ft³).
    pub const REFERENCE_TRAIN_VOLUME_M3: f64 = 200.0 * M3_PER_FT3;
}

/// Basic unit conversion helpers.
pub mod units {
    use serde::{Deserialize, Serialize};

    use super::constants::{M3_PER_FT3, ONE_ATMOSPHERE_PSI};

    const PSI_PER_INHG: f64 = 0.491_154_1;
    const PSI_PER_BAR: f64 = 14.503_773_8;
    const PSI_PER_KPA: f64 = 0.145_037_738;
    const PSI_PER_KGF_CM2: f64 = 14.223_343_3;

    /// Display units for pressure readouts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PressureUnit {
        Psi,
        InHg,
        Bar,
        KPa,
        KgfPerCm2,
    }

    impl PressureUnit {
        /// Short suffix used in formatted readouts.
        pub fn suffix(self) -> &'static str {
            match self {
                PressureUnit::Psi => "psi",
                PressureUnit::InHg => "inHg",
                PressureUnit::Bar => "bar",
                PressureUnit::KPa => "kPa",
                PressureUnit::KgfPerCm2 => "kgf/cm²",
            }
        }

        fn psi_per_unit(self) -> f64 {
            match self {
                PressureUnit::Psi => 1.0,
                PressureUnit::InHg => PSI_PER_INHG,
                PressureUnit::Bar => PSI_PER_BAR,
                PressureUnit::KPa => PSI_PER_KPA,
                PressureUnit::KgfPerCm2 => PSI_PER_KGF_CM2,
            }
        }

        /// Convert a pressure difference in psi into this unit.
        #[inline]
        pub fn from_psi(self, psi: f64) -> f64 {
            psi / self.psi_per_unit()
        }

        /// Convert a pressure difference in this unit into psi.
        #[inline]
        pub fn to_psi(self, value: f64) -> f64 {
            value * self.psi_per_unit()
        }
    }

    /// Display units for volume readouts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum VolumeUnit {
        CubicMetre,
        CubicFoot,
    }

    impl VolumeUnit {
        pub fn suffix(self) -> &'static str {
            match self {
                VolumeUnit::CubicMetre => "m³",
                VolumeUnit::CubicFoot => "ft³",
            }
        }

        #[inline]
        pub fn from_m3(self, m3: f64) -> f64 {
            match self {
                VolumeUnit::CubicMetre => m3,
                VolumeUnit::CubicFoot => m3 / M3_PER_FT3,
            }
        }
    }

    /// Convert inches of mercury to psi.
    #[inline]
    pub fn inhg_to_psi(v: f64) -> f64 {
        v * PSI_PER_INHG
    }

    /// Absolute pressure (psia) corresponding to a vacuum gauge reading in inHg.
    #[inline]
    pub fn vacuum_to_psia(vacuum_inhg: f64) -> f64 {
        ONE_ATMOSPHERE_PSI - inhg_to_psi(vacuum_inhg)
    }

    /// Convert cubic feet to cubic metres.
    #[inline]
    pub fn ft3_to_m3(v: f64) -> f64 {
        v * M3_PER_FT3
    }
}
