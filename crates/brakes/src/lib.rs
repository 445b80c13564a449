//! Train brake simulation.
//!
//! Every car carries a [`CarBrakes`]: static [`BrakeParams`], the dynamic [`BrakeState`], and a
//! [`BrakeSystem`] variant holding whatever extra state its family needs (vacuum reservoir,
//! triple valve, manual brake wheel). A [`Train`] advances all cars once per tick: the lead
//! locomotive's pipe is driven first by [`pipe::propagate`], then every connected car reads that
//! pressure as a frozen snapshot and runs its own transfer function.

pub mod air;
pub mod manual;
pub mod params;
pub mod pipe;
pub mod state;
pub mod status;
pub mod system;
pub mod train;
pub mod transfer;
pub mod vacuum;

pub use params::BrakeParams;
pub use pipe::{ControllerState, LeadPipeInput, TrainVolumes};
pub use state::BrakeState;
pub use status::{BrakeSystemComponent, UnitPreferences};
pub use system::{BrakeSystem, BrakeSystemKind, CarBrakes};
pub use train::{Car, Train, TrainError};
