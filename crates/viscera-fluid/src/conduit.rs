//! Transport conduits: passive pipes between two containers.
//!
//! A conduit holds its own in-transit contents. Each tick it pushes half of
//! what it carries (scaled by `dt`) toward its sink, so it empties
//! asymptotically rather than at a fixed rate. Reflux runs the other way.
//! Either end may be missing; transfers toward a missing end do nothing.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use viscera_core::error::ValidationError;
use viscera_core::fluid::FluidType;
use viscera_core::id::ContainerId;
use viscera_core::units::{Dt, Volume, non_negative};

use crate::container::{FillPolicy, FluidContainer};

/// Standalone containers a conduit can connect, keyed by id.
pub type ContainerArena = SlotMap<ContainerId, FluidContainer>;

/// Share of pending contents pushed per unit of `dt`.
pub const PUSH_SHARE_PER_TICK: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConduit {
    name: String,
    source: Option<ContainerId>,
    sink: Option<ContainerId>,
    pending: FluidContainer,
}

impl TransportConduit {
    /// A conduit that can carry `volume` in transit.
    pub fn new(name: impl Into<String>, volume: Volume) -> Result<Self, ValidationError> {
        Ok(Self {
            name: name.into(),
            source: None,
            sink: None,
            pending: FluidContainer::new(volume)?,
        })
    }

    pub fn connect(mut self, source: Option<ContainerId>, sink: Option<ContainerId>) -> Self {
        self.source = source;
        self.sink = sink;
        self
    }

    pub fn set_source(&mut self, source: Option<ContainerId>) {
        self.source = source;
    }

    pub fn set_sink(&mut self, sink: Option<ContainerId>) {
        self.sink = sink;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<ContainerId> {
        self.source
    }

    pub fn sink(&self) -> Option<ContainerId> {
        self.sink
    }

    pub fn pending(&self) -> &FluidContainer {
        &self.pending
    }

    pub fn pending_total(&self) -> Volume {
        self.pending.total()
    }

    /// Take fluid straight into the conduit, up to its transit volume.
    pub fn accept(&mut self, fluid: FluidType, amount: Volume) -> Volume {
        self.pending.add(fluid, amount, FillPolicy::Clamp)
    }

    /// Draw fluid from the upstream source into the conduit.
    pub fn intake(&mut self, arena: &mut ContainerArena, fluid: FluidType, amount: Volume) -> Volume {
        let Some(source) = self.source.and_then(|id| arena.get_mut(id)) else {
            return 0.0;
        };
        let wanted = non_negative(amount).min(self.pending.headroom());
        let taken = source.drain(fluid, wanted);
        self.pending.add(fluid, taken, FillPolicy::Overflow)
    }

    /// Move up to `amount` of the dominant pending fluid into the sink.
    ///
    /// Mixed contents are treated as the single largest component; the rest
    /// waits for a later push. Returns the amount the sink absorbed.
    pub fn push(&mut self, arena: &mut ContainerArena, amount: Volume) -> Volume {
        let Some(sink) = self.sink.and_then(|id| arena.get_mut(id)) else {
            return 0.0;
        };
        let Some((fluid, available)) = self.pending.dominant() else {
            return 0.0;
        };
        let moving = non_negative(amount).min(available);
        let absorbed = sink.add(fluid, moving, FillPolicy::Clamp);
        self.pending.drain(fluid, absorbed)
    }

    /// Push `pending_total * 0.5 * dt` (at most everything) toward the sink.
    pub fn tick(&mut self, arena: &mut ContainerArena, dt: Dt) -> Volume {
        let total = self.pending.total();
        let amount = (total * PUSH_SHARE_PER_TICK * dt.get()).min(total);
        self.push(arena, amount)
    }

    /// Send fluid back toward the source.
    ///
    /// In-transit fluid goes first, then the sink's contents. Limited by the
    /// source's headroom. Returns the amount moved.
    pub fn reflux(&mut self, arena: &mut ContainerArena, fluid: FluidType, amount: Volume) -> Volume {
        let Some(source_id) = self.source.filter(|id| arena.contains_key(*id)) else {
            return 0.0;
        };
        let room = arena[source_id].headroom();
        let wanted = non_negative(amount).min(room);

        let mut moved = self.pending.drain(fluid, wanted);
        if moved < wanted {
            if let Some(sink) = self.sink.and_then(|id| arena.get_mut(id)) {
                moved += sink.drain(fluid, wanted - moved);
            }
        }
        arena[source_id].add(fluid, moved, FillPolicy::Overflow)
    }
}
