use serde::{Deserialize, Serialize};

/// Dynamic brake state shared by every brake family.
///
/// Pressures follow the family convention: absolute psi for vacuum systems, gauge psi for air
/// systems. Manual brakes leave both pressures untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrakeState {
    pub pipe_psi: f64,
    pub cylinder_psi: f64,
    pub handbrake_percent: f64,
    pub front_hose_connected: bool,
    pub angle_cock_a_open: bool,
    pub angle_cock_b_open: bool,
    pub stuck: bool,
    pub skid: bool,
    pub retard_force_n: f64,
    pub brake_force_n: f64,
}

impl BrakeState {
    /// State with both pipe and cylinder at `pressure_psi` and a fully coupled car.
    pub fn at_pressure(pressure_psi: f64) -> Self {
        Self {
            pipe_psi: pressure_psi,
            cylinder_psi: pressure_psi,
            handbrake_percent: 0.0,
            front_hose_connected: true,
            angle_cock_a_open: true,
            angle_cock_b_open: true,
            stuck: false,
            skid: false,
            retard_force_n: 0.0,
            brake_force_n: 0.0,
        }
    }

    /// Front hose flag shown in status rows: `I` when the hose is coupled, `T` when it is not.
    pub fn connection_label(&self) -> &'static str {
        if self.front_hose_connected { "I" } else { "T" }
    }

    /// Angle cock summary, `+` open and `-` closed.
    pub fn angle_cock_label(&self) -> String {
        let sign = |open: bool| if open { '+' } else { '-' };
        format!(
            "A{} B{}",
            sign(self.angle_cock_a_open),
            sign(self.angle_cock_b_open)
        )
    }
}
