// Domain layer: resolved application model and the handler port.

pub mod model;
pub mod ports;
