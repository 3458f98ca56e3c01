use std::{cell::RefCell, rc::Rc};

/// Random number generation during simulation execution runs through a
/// shared, dynamically-dispatched generator, so that a whole simulation
/// draws from a single reproducible stream.
pub trait SimulationRng: std::fmt::Debug + rand::RngCore {}
impl<T: std::fmt::Debug + rand::RngCore> SimulationRng for T {}

pub type DynRng = Rc<RefCell<dyn SimulationRng>>;

/// The default generator is a seeded PCG, for reproducible simulation
/// runs and replicable analyses.
pub(crate) fn default_rng() -> DynRng {
    Rc::new(RefCell::new(rand_pcg::Pcg64Mcg::new(42)))
}

/// Wrap a concrete generator for use as a simulation-wide `DynRng`.
pub fn dyn_rng<Rng: SimulationRng + 'static>(rng: Rng) -> DynRng {
    Rc::new(RefCell::new(rng))
}
