use crate::core::hardware::HardwareAdapter;

mod linux;
mod simulated;

pub use linux::LinuxAdapter;
pub use simulated::{SimulatedAdapter, Simulator};

pub fn get_adapter() -> Box<dyn HardwareAdapter> {
    Box::new(LinuxAdapter::new())
}
