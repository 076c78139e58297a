//! # jarfill - particle fill and surface sampling for containers
//!
//! Fills a triangulated container (a spice jar, a bottle) with layers of
//! particles. Each substance occupies a vertical band given in percent of the
//! container height; particles are scattered over the container's inner
//! surface with uniform density per unit area, and the topmost layer is closed
//! by a flat cap rebuilt from the container's own vertices so the fill looks
//! settled.
//!
//! ## Quick Start
//!
//! ```ignore
//! use jarfill::prelude::*;
//!
//! let jar = ContainerSurface::lathe(&[(0.0, 0.0), (1.0, 0.0), (1.0, 8.0), (0.7, 10.0)], 64);
//! let mut session = FillSession::new(jar, FillConfig::default());
//!
//! let salt = session.add_substance(Substance::new("salt", 40.0).with_band(0.0, 30.0))?;
//! let pepper = session.add_substance(
//!     Substance::new("pepper", 40.0)
//!         .with_band(30.0, 55.0)
//!         .with_size(0.05, 0.5)
//!         .with_color(Vec3::new(0.2, 0.15, 0.1), 0.4),
//! )?;
//!
//! session.recompute_all();
//! let sprites = session.emit(pepper)?;
//! upload(sprites.as_bytes());
//! ```
//!
//! ## Pipeline
//!
//! | Step | Module |
//! |------|--------|
//! | Percent band to absolute heights | [`band`] |
//! | Particle budget per substance | [`allocator`] |
//! | Flat cap on the topmost band | [`cap`] |
//! | Area-weighted surface points | [`sampler`] |
//! | Clamping, apex mound, inward pull, jitter | [`placement`] |
//! | Sprite or instance buffers | [`emitter`] |
//!
//! [`FillSession`] drives the whole pipeline, tracks which particle sets are
//! out of date and runs recomputes in the background.
//!
//! ## Logging
//!
//! The crate logs through the `log` facade. Install any logger (for example
//! `env_logger`) to see shortfall and degenerate-cap warnings.

#[macro_use]
extern crate log;

pub mod allocator;
pub mod band;
pub mod cap;
pub mod config;
pub mod emitter;
mod error;
pub mod placement;
pub mod sampler;
mod session;
pub mod substance;
pub mod surface;

pub use bytemuck;
pub use band::{to_height_range, FillBand, HeightRange};
pub use cap::TopSurfacePolygon;
pub use config::{CapConfig, CapTriangulation, FillConfig, PlacementConfig, SessionConfig};
pub use emitter::{InstanceRaw, MeshInstanceEmitter, ParticleEmitter, Renderable, SpriteEmitter, SpriteVertex};
pub use error::FillError;
pub use glam::{Quat, Vec3};
pub use placement::{ParticleInstance, Placement, PlacementEngine};
pub use sampler::{SampledPoint, SurfaceSampler};
pub use session::{FillSession, ParticleSet, ParticleState};
pub use substance::{Substance, SubstanceId, VisualKind};
pub use surface::{ContainerSurface, HeightExtent, Triangle};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use jarfill::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{FillConfig, SessionConfig};
    pub use crate::emitter::Renderable;
    pub use crate::error::FillError;
    pub use crate::session::{FillSession, ParticleState};
    pub use crate::substance::{Substance, SubstanceId, VisualKind};
    pub use crate::surface::ContainerSurface;
    pub use crate::{Quat, Vec3};
}
