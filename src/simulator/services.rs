use serde::{Deserialize, Serialize};

use crate::input_modeling::dynamic_rng::{default_rng, DynRng};

/// The simulator provides a shared random number generator and the
/// simulation clock to models during the execution of a simulation.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Services {
    #[serde(skip, default = "default_rng")]
    global_rng: DynRng,
    global_time: f64,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            global_rng: default_rng(),
            global_time: 0.0,
        }
    }
}

impl Services {
    pub fn global_rng(&self) -> DynRng {
        self.global_rng.clone()
    }

    pub fn global_time(&self) -> f64 {
        self.global_time
    }

    pub(crate) fn set_global_time(&mut self, time: f64) {
        self.global_time = time;
    }

    /// Replace the shared generator, typically with a differently-seeded
    /// one for replications.
    pub fn set_global_rng(&mut self, rng: DynRng) {
        self.global_rng = rng;
    }
}
