// Small process-wide helpers shared by every layer above the domain.

pub mod clock;
pub mod rng;

pub use clock::now_millis;
pub use rng::rand_id;
