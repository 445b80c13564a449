//! Ordered cars, the lead locomotive, and the per-tick update order.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipe::{self, LeadPipeInput, TrainVolumes};
use crate::system::CarBrakes;

#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
    #[error("a train needs at least one car")]
    EmptyTrain,
    #[error("lead index {index} is out of range for a train of {len} cars")]
    LeadOutOfRange { index: usize, len: usize },
    #[error("car '{0}' has no lead equipment and cannot lead the train")]
    LeadNotLocomotive(String),
    #[error("car '{car}' has {kind} brakes and cannot share a pipe with a {lead} lead")]
    MixedBrakeSystems {
        car: String,
        kind: &'static str,
        lead: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub brakes: CarBrakes,
    /// Driver's brake equipment; only locomotives carry it.
    pub lead: Option<LeadPipeInput>,
}

impl Car {
    pub fn new(id: impl Into<String>, brakes: CarBrakes) -> Self {
        Self {
            id: id.into(),
            brakes,
            lead: None,
        }
    }

    pub fn with_lead(mut self, lead: LeadPipeInput) -> Self {
        self.lead = Some(lead);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Train {
    cars: Vec<Car>,
    lead: Option<usize>,
}

impl Train {
    pub fn new(cars: Vec<Car>, lead: Option<usize>) -> Result<Self, TrainError> {
        if cars.is_empty() {
            return Err(TrainError::EmptyTrain);
        }
        if let Some(index) = lead {
            let lead_car = cars.get(index).ok_or(TrainError::LeadOutOfRange {
                index,
                len: cars.len(),
            })?;
            if lead_car.lead.is_none() {
                return Err(TrainError::LeadNotLocomotive(lead_car.id.clone()));
            }
            let lead_kind = lead_car.brakes.kind();
            if let Some(car) = cars
                .iter()
                .find(|car| !car.brakes.kind().pipe_compatible_with(lead_kind))
            {
                return Err(TrainError::MixedBrakeSystems {
                    car: car.id.clone(),
                    kind: car.brakes.kind().label(),
                    lead: lead_kind.label(),
                });
            }
        }
        debug!("assembled train of {} cars, lead {:?}", cars.len(), lead);
        Ok(Self { cars, lead })
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    /// Mutable access to the cars for handbrakes, hoses and angle cocks.
    pub fn cars_mut(&mut self) -> &mut [Car] {
        &mut self.cars
    }

    pub fn lead_index(&self) -> Option<usize> {
        self.lead
    }

    pub fn lead_car(&self) -> Option<&Car> {
        self.lead.and_then(|index| self.cars.get(index))
    }

    /// Driver's controls of the lead locomotive.
    pub fn lead_controls_mut(&mut self) -> Option<&mut LeadPipeInput> {
        let index = self.lead?;
        self.cars.get_mut(index)?.lead.as_mut()
    }

    /// Cars joined to the lead through connected hoses and open angle cocks.
    pub fn connected_to_lead(&self) -> Vec<bool> {
        let mut connected = vec![false; self.cars.len()];
        let Some(lead) = self.lead.filter(|index| *index < self.cars.len()) else {
            return connected;
        };
        connected[lead] = true;

        for i in lead + 1..self.cars.len() {
            if !self.coupled(i - 1, i) {
                break;
            }
            connected[i] = true;
        }
        for i in (0..lead).rev() {
            if !self.coupled(i, i + 1) {
                break;
            }
            connected[i] = true;
        }
        connected
    }

    /// Whether air can pass between `front` and the car directly behind it.
    fn coupled(&self, front: usize, rear: usize) -> bool {
        let (a, b) = (&self.cars[front].brakes, &self.cars[rear].brakes);
        a.kind().has_pipe()
            && b.kind().has_pipe()
            && a.state.angle_cock_b_open
            && b.state.angle_cock_a_open
            && b.state.front_hose_connected
    }

    pub fn volumes(&self) -> TrainVolumes {
        let mut volumes = TrainVolumes::default();
        for (car, connected) in self.cars.iter().zip(self.connected_to_lead()) {
            if !car.brakes.kind().has_pipe() {
                continue;
            }
            let pipe = car.brakes.params.pipe_volume_m3;
            let cylinder = car.brakes.params.cylinder_volume_total_m3();
            volumes.pipe_m3 += pipe;
            volumes.cylinder_m3 += cylinder;
            volumes.system_m3 += pipe + cylinder;
            if connected {
                volumes.current_system_m3 += pipe + cylinder;
            }
        }
        volumes
    }

    /// Advance every car by `dt` seconds.
    ///
    /// The lead pipe is propagated first; its new value is copied to every connected car
    /// before any car advances. Without a lead nothing changes.
    pub fn tick(&mut self, dt: f64) {
        let Some(lead_index) = self.lead else {
            trace!("no lead locomotive, tick skipped");
            return;
        };
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let volumes = self.volumes();
        let Some(lead) = self.cars.get(lead_index) else {
            return;
        };
        let Some(input) = lead.lead else {
            return;
        };

        let snapshot = pipe::propagate(
            lead.brakes.kind(),
            lead.brakes.state.pipe_psi,
            &input,
            &volumes,
            dt,
        );
        trace!("lead pipe {:.4} psi after {dt} s", snapshot);

        let connected = self.connected_to_lead();
        for (car, linked) in self.cars.iter_mut().zip(connected) {
            if linked && car.brakes.kind().has_pipe() {
                car.brakes.state.pipe_psi = snapshot;
            }
            car.brakes.advance(dt);
        }
    }
}
