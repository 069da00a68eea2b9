// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Training runs on Autodiff<Wgpu> so gradients are tracked;
// evaluation and translation run on the plain Wgpu backend
// (model.valid() converts between the two).
//
// The device is chosen once from the --cpu flag and then
// passed explicitly to everything that creates tensors.

use burn::backend::{
    wgpu::{Wgpu, WgpuDevice},
    Autodiff,
};

pub type TrainBackend = Autodiff<Wgpu>;
pub type InferBackend = Wgpu;

/// `WgpuDevice::Cpu` when forced, otherwise the default adapter
pub fn select_device(cpu: bool) -> WgpuDevice {
    let device = if cpu { WgpuDevice::Cpu } else { WgpuDevice::default() };
    tracing::info!("Using WGPU device: {:?}", device);
    device
}
