// sim-gateway - order intent to execution, simulated fill model

mod gateway;

pub use gateway::{ExecutionGateway, GatewayMetrics, GatewayTask, SimGateway, SimGatewayConfig};
