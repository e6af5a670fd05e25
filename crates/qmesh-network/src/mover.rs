//! Quantum relay mover
//!
//! Moves the units of a quantum packet along the full sender to receiver
//! route before the packet itself is routed. Hops are the outer loop and units
//! the inner one, so every unit advances one hop before any advances two.

use chrono::Utc;
use qmesh_core::{Packet, Payload};
use tracing::{debug, trace};

use crate::error::{DispatchError, DispatchResult};
use crate::event::DispatchEvent;
use crate::state::NetworkState;

/// Move every unit in `packet` to its receiver, updating handles in place
pub(crate) async fn move_units(state: &NetworkState, packet: &mut Packet) -> DispatchResult<()> {
    let Payload::Units(units) = &mut packet.payload else {
        return Err(DispatchError::MissingPayload {
            protocol: packet.protocol.to_string(),
        });
    };

    let route = state.route(&packet.sender, &packet.receiver)?;
    let origin = route.sender();
    let last_link = route.len() - 2;

    for (link, (from, to)) in route.links().enumerate() {
        let from_peer = state.peer(from)?;
        let to_peer = state.peer(to)?;
        let to_name = to_peer.display_name().to_string();

        for unit in units.iter_mut() {
            from_peer
                .send_unit(unit.handle.clone(), &to_name)
                .await
                .map_err(DispatchError::peer(from))?;
            unit.handle = to_peer
                .recv_unit()
                .await
                .map_err(DispatchError::peer(to))?;
            unit.blocked = false;

            if link == last_link && state.config.store_delivered_units {
                to_peer.add_data_unit(origin, unit.clone());
            }
        }
        trace!(from = %from, to = %to, units = units.len(), "Units crossed link");
    }

    debug!(route = %route, units = units.len(), "Quantum units moved");
    state.stats.record_quantum_transfer(units.len());
    state.emit(DispatchEvent::QuantumMoved {
        from: route.sender().clone(),
        to: route.receiver().clone(),
        units: units.len(),
        timestamp: Utc::now(),
    });
    Ok(())
}
