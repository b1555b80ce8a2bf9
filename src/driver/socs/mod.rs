#[cfg(all(feature = "nrf52840", target_arch = "arm", target_os = "none"))]
pub mod nrf;
