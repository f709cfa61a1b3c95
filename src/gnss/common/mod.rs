
/// Values exchanged between tracking and its neighbours (acquisition upstream, telemetry and PVT downstream)
pub mod tracking;
